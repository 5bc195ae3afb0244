//! Human-readable previews of file prefixes for diagnostics.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of leading bytes captured by [`BytePreview::read_from`].
pub const PREVIEW_LEN: usize = 64;

/// The first bytes of a file, rendered with ASCII escaping.
///
/// # Examples
///
/// ```
/// use vsix_downloader::preview::BytePreview;
///
/// let preview = BytePreview::from_bytes(b"<html>\n\x00");
/// assert_eq!(preview.to_string(), "\"<html>\\n\\x00\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytePreview {
    bytes: Vec<u8>,
}

impl BytePreview {
    /// Capture up to [`PREVIEW_LEN`] bytes from `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let len = bytes.len().min(PREVIEW_LEN);
        Self {
            bytes: bytes.iter().take(len).copied().collect(),
        }
    }

    /// Read up to [`PREVIEW_LEN`] bytes from the start of the file at `path`.
    ///
    /// A file that cannot be read yields an empty preview.
    #[must_use]
    pub fn read_from(path: &Path) -> Self {
        let mut bytes = Vec::with_capacity(PREVIEW_LEN);
        if let Ok(file) = File::open(path) {
            if file.take(PREVIEW_LEN as u64).read_to_end(&mut bytes).is_err() {
                bytes.clear();
            }
        }
        Self { bytes }
    }

    /// The captured bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for BytePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bytes.is_empty() {
            return f.write_str("(empty)");
        }
        write!(f, "\"{}\"", self.bytes.escape_ascii())
    }
}
