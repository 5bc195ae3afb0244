//! Error types for the VSIX download pipeline.
//!
//! Failures fall into four families: a malformed extension spec, a transport
//! failure reported by the HTTP collaborator, a filesystem failure, and a
//! payload that is not a ZIP container. The last one is by far the most
//! common in practice: a wrong version or target platform makes the
//! marketplace answer with an HTML page instead of a package, so the error
//! carries a preview of the offending bytes.

use crate::preview::BytePreview;
use crate::transport::TransportError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while producing a VSIX artefact.
#[derive(Debug, Error)]
pub enum VsixError {
    /// The extension identifier or version cannot be used to build a request.
    #[error("invalid extension spec \"{identifier}\": {reason}")]
    InvalidSpec {
        /// The rejected identifier (or full spec string).
        identifier: String,
        /// Description of the violated constraint.
        reason: String,
    },

    /// The HTTP collaborator failed or answered with a non-success status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Directory creation, write, or rename failed.
    #[error(transparent)]
    Filesystem(#[from] std::io::Error),

    /// The payload is not a structurally valid ZIP container.
    #[error(
        "{path} is not a ZIP/VSIX container: {reason}; this usually means the marketplace \
         returned an error page (wrong version, wrong target platform, or unknown extension); \
         first bytes: {preview}"
    )]
    NotAnArchive {
        /// The file that failed validation.
        path: Utf8PathBuf,
        /// What the validation step was doing when it gave up.
        reason: String,
        /// Escaped rendering of the first bytes of the file.
        preview: BytePreview,
    },
}

impl VsixError {
    /// Build an [`VsixError::InvalidSpec`] from displayable parts.
    pub(crate) fn invalid_spec(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` when the error reports an unusable payload.
    #[must_use]
    pub const fn is_not_an_archive(&self) -> bool {
        matches!(self, Self::NotAnArchive { .. })
    }
}

/// Result type alias using [`VsixError`].
pub type Result<T> = std::result::Result<T, VsixError>;
