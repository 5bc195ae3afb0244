//! Marketplace download URL construction.

use crate::error::Result;
use crate::spec::ExtensionSpec;

/// Base URL of the public Visual Studio Marketplace gallery API.
pub const MARKETPLACE_BASE_URL: &str = "https://marketplace.visualstudio.com/_apis/public/gallery";

/// Query parameter narrowing a download to one target platform.
pub const TARGET_PLATFORM_PARAM: &str = "targetPlatform";

/// Build the package download URL for `spec` against `base`.
///
/// The platform query parameter is appended only when the spec names a
/// platform; universal packages are requested without it.
///
/// # Errors
///
/// Returns [`crate::error::VsixError::InvalidSpec`] when the identifier is
/// not of the form `publisher.package`.
///
/// # Examples
///
/// ```
/// use vsix_downloader::spec::ExtensionSpec;
/// use vsix_downloader::url::{MARKETPLACE_BASE_URL, build_download_url};
///
/// let spec = ExtensionSpec::new("ms-vscode.cpptools", "1.30.0").with_platform("linux-x64");
/// let url = build_download_url(&spec, MARKETPLACE_BASE_URL).expect("valid spec");
/// assert!(url.ends_with(
///     "/publishers/ms-vscode/vsextensions/cpptools/1.30.0/vspackage?targetPlatform=linux-x64"
/// ));
/// ```
pub fn build_download_url(spec: &ExtensionSpec, base: &str) -> Result<String> {
    let (publisher, package) = spec.publisher_and_package()?;
    let base = base.trim_end_matches('/');
    let version = spec.version();
    let mut url =
        format!("{base}/publishers/{publisher}/vsextensions/{package}/{version}/vspackage");
    if let Some(platform) = spec.platform() {
        url.push('?');
        url.push_str(TARGET_PLATFORM_PARAM);
        url.push('=');
        url.push_str(platform);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VsixError;
    use rstest::rstest;

    const BASE: &str = "https://gallery.example.test/api";

    #[rstest]
    #[case::with_platform(Some("linux-x64"))]
    #[case::universal(None)]
    fn places_segments_and_platform(#[case] platform: Option<&str>) {
        let spec = ExtensionSpec::new("acme.widgets", "0.9.1");
        let spec = match platform {
            Some(platform) => spec.with_platform(platform),
            None => spec,
        };

        let url = build_download_url(&spec, BASE).expect("valid spec");
        assert!(url.starts_with(
            "https://gallery.example.test/api/publishers/acme/vsextensions/widgets/0.9.1/vspackage"
        ));
        assert_eq!(url.contains(TARGET_PLATFORM_PARAM), platform.is_some());
        if let Some(platform) = platform {
            assert!(url.ends_with(&format!("?targetPlatform={platform}")));
        }
    }

    #[test]
    fn ignores_trailing_slash_on_base() {
        let spec = ExtensionSpec::new("acme.widgets", "1.0.0");
        let url = build_download_url(&spec, "https://gallery.example.test/api/").expect("valid");
        assert!(url.contains("/api/publishers/acme/"));
    }

    #[test]
    fn default_base_targets_marketplace() {
        let spec = ExtensionSpec::new("acme.widgets", "1.0.0");
        let url = build_download_url(&spec, MARKETPLACE_BASE_URL).expect("valid");
        assert!(url.starts_with("https://marketplace.visualstudio.com/"));
    }

    #[rstest]
    #[case("widgets")]
    #[case("acme-widgets")]
    fn rejects_identifier_without_separator(#[case] identifier: &str) {
        let spec = ExtensionSpec::new(identifier, "1.0.0").with_platform("linux-x64");
        let result = build_download_url(&spec, BASE);
        assert!(matches!(result, Err(VsixError::InvalidSpec { .. })));
    }
}
