//! Output filename resolution.
//!
//! The marketplace usually suggests a filename through `Content-Disposition`.
//! That name is untrusted: it is reduced to a single path segment and forced
//! onto the `.vsix` extension. Without a usable header, a deterministic name
//! is derived from the extension spec instead.
//!
//! Resolution happens once per download, before the body is read, so the
//! destination path is fixed for the whole transfer.

use crate::headers::{CONTENT_DISPOSITION, ResponseHeaders};
use crate::spec::ExtensionSpec;
use percent_encoding::percent_decode_str;
use std::fmt;

/// Canonical extension of an installable extension package.
pub const VSIX_EXTENSION: &str = ".vsix";

/// Generic archive extension swapped for [`VSIX_EXTENSION`].
const ZIP_EXTENSION: &str = ".zip";

/// Name used when a server-provided name sanitizes to nothing.
pub const DEFAULT_FILENAME: &str = "download.vsix";

/// A validated output filename.
///
/// Always non-empty, free of path separators, and ending in `.vsix`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedFilename(String);

impl ResolvedFilename {
    /// Borrow the filename.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResolvedFilename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Decide the final filename for `spec` from the response `headers`.
///
/// Prefers a sanitized `Content-Disposition` name and falls back to
/// [`fallback_filename`].
///
/// # Examples
///
/// ```
/// use vsix_downloader::filename::resolve_filename;
/// use vsix_downloader::headers::ResponseHeaders;
/// use vsix_downloader::spec::ExtensionSpec;
///
/// let spec = ExtensionSpec::new("pub.pkg", "1.0.0").with_platform("linux-x64");
/// let name = resolve_filename(&spec, &ResponseHeaders::new());
/// assert_eq!(name.as_str(), "pub.pkg-1.0.0-linux-x64.vsix");
/// ```
#[must_use]
pub fn resolve_filename(spec: &ExtensionSpec, headers: &ResponseHeaders) -> ResolvedFilename {
    let chosen = headers
        .get(CONTENT_DISPOSITION)
        .and_then(filename_from_content_disposition)
        .map_or_else(|| fallback_filename(spec), |name| sanitize_filename(&name));
    ResolvedFilename(ensure_vsix_extension(&chosen))
}

/// Extract a filename from a `Content-Disposition` header value.
///
/// Supports `filename*=CHARSET''<percent-encoded>`, `filename="x"` and
/// `filename=x`, preferring the extended form. Empty values count as absent.
#[must_use]
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let params: Vec<(String, &str)> = header
        .split(';')
        .filter_map(|param| param.split_once('='))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), unquote(value)))
        .collect();

    if let Some((_, value)) = params.iter().find(|(key, _)| key == "filename*") {
        let encoded = value.split_once("''").map_or(*value, |(_, encoded)| encoded);
        let decoded = percent_decode_str(encoded).decode_utf8_lossy();
        if !decoded.is_empty() {
            return Some(decoded.into_owned());
        }
    }

    params
        .iter()
        .find(|(key, value)| key == "filename" && !value.is_empty())
        .map(|(_, value)| (*value).to_owned())
}

/// Strip surrounding whitespace and one pair of double quotes.
fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    trimmed.strip_suffix('"').unwrap_or(trimmed)
}

/// Reduce an untrusted name to a single safe path segment.
///
/// Keeps only the final path component, removes NUL bytes, and trims
/// whitespace. Names that end up empty (or as `.`/`..`) become
/// [`DEFAULT_FILENAME`]. Applying the function twice gives the same result
/// as applying it once.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let last_segment = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last_segment.chars().filter(|c| *c != '\0').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        DEFAULT_FILENAME.to_owned()
    } else {
        cleaned.to_owned()
    }
}

/// Deterministic name for a spec: `{identifier}-{version}[-{platform}].vsix`.
#[must_use]
pub fn fallback_filename(spec: &ExtensionSpec) -> String {
    let mut name = format!("{}-{}", spec.identifier(), spec.version());
    if let Some(platform) = spec.platform() {
        name.push('-');
        name.push_str(platform);
    }
    name.push_str(VSIX_EXTENSION);
    sanitize_filename(&name)
}

/// Force `name` onto the canonical `.vsix` extension.
///
/// A `.vsix` suffix in any case is normalized to lowercase, a `.zip` suffix
/// is swapped, and anything else gets `.vsix` appended.
#[must_use]
pub fn ensure_vsix_extension(name: &str) -> String {
    if let Some(stem) = strip_suffix_ignore_case(name, VSIX_EXTENSION)
        .or_else(|| strip_suffix_ignore_case(name, ZIP_EXTENSION))
    {
        if !stem.is_empty() {
            return format!("{stem}{VSIX_EXTENSION}");
        }
    }
    format!("{name}{VSIX_EXTENSION}")
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(suffix.len())?;
    let (stem, tail) = (name.get(..split)?, name.get(split..)?);
    tail.eq_ignore_ascii_case(suffix).then_some(stem)
}
