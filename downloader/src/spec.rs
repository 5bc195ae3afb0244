//! Extension specs: what to fetch from the marketplace.
//!
//! An [`ExtensionSpec`] names a single package version, optionally narrowed
//! to one target platform. Specs are immutable once built.

use crate::error::{Result, VsixError};
use std::fmt;
use std::str::FromStr;

/// Separator between publisher and package in an extension identifier.
pub const IDENTIFIER_SEPARATOR: char = '.';

/// Separator between the parts of the textual spec form.
const SPEC_FIELD_SEPARATOR: char = '@';

/// One VS Code extension version to download.
///
/// # Examples
///
/// ```
/// use vsix_downloader::spec::ExtensionSpec;
///
/// let spec = ExtensionSpec::new("ms-vscode.cpptools", "1.30.0").with_platform("linux-x64");
/// assert_eq!(spec.to_string(), "ms-vscode.cpptools@1.30.0@linux-x64");
///
/// let parsed: ExtensionSpec = "ms-python.python@2025.1.0".parse().expect("valid spec");
/// assert!(parsed.platform().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionSpec {
    identifier: String,
    version: String,
    platform: Option<String>,
}

impl ExtensionSpec {
    /// Create a platform-independent spec.
    #[must_use]
    pub fn new(identifier: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version: version.into(),
            platform: None,
        }
    }

    /// Narrow the spec to a marketplace target platform (e.g. `linux-x64`).
    #[must_use]
    pub fn with_platform(self, platform: impl Into<String>) -> Self {
        Self {
            platform: Some(platform.into()),
            ..self
        }
    }

    /// The `publisher.package` identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The requested version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The target platform, if the package is platform-specific.
    #[must_use]
    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    /// Split the identifier into `(publisher, package)` at the first separator.
    ///
    /// # Errors
    ///
    /// Returns [`VsixError::InvalidSpec`] when the identifier has no
    /// separator or either half is empty.
    pub fn publisher_and_package(&self) -> Result<(&str, &str)> {
        match self.identifier.split_once(IDENTIFIER_SEPARATOR) {
            Some((publisher, package)) if !publisher.is_empty() && !package.is_empty() => {
                Ok((publisher, package))
            }
            Some(_) => Err(VsixError::invalid_spec(
                &self.identifier,
                "publisher and package name must both be non-empty",
            )),
            None => Err(VsixError::invalid_spec(
                &self.identifier,
                format!("expected \"publisher{IDENTIFIER_SEPARATOR}package\""),
            )),
        }
    }
}

impl fmt::Display for ExtensionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SPEC_FIELD_SEPARATOR}{}", self.identifier, self.version)?;
        if let Some(platform) = &self.platform {
            write!(f, "{SPEC_FIELD_SEPARATOR}{platform}")?;
        }
        Ok(())
    }
}

impl FromStr for ExtensionSpec {
    type Err = VsixError;

    /// Parse `publisher.package@version[@platform]`.
    fn from_str(raw: &str) -> Result<Self> {
        let mut fields = raw.trim().split(SPEC_FIELD_SEPARATOR);
        let identifier = fields.next().unwrap_or_default();
        let version = fields.next().unwrap_or_default();
        let platform = fields.next();

        if fields.next().is_some() {
            return Err(VsixError::invalid_spec(
                raw,
                "expected \"publisher.package@version[@platform]\"",
            ));
        }
        if version.is_empty() {
            return Err(VsixError::invalid_spec(raw, "missing version"));
        }

        let spec = Self::new(identifier, version);
        let spec = match platform {
            Some("") => {
                return Err(VsixError::invalid_spec(raw, "empty target platform"));
            }
            Some(platform) => spec.with_platform(platform),
            None => spec,
        };
        spec.publisher_and_package()?;
        Ok(spec)
    }
}
