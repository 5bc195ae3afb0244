//! Download configuration.
//!
//! [`DownloadConfig`] gathers everything the pipeline needs besides the
//! transport: where artefacts land, whether to repack, and how requests
//! identify themselves.

use crate::url::MARKETPLACE_BASE_URL;
use camino::{Utf8Path, Utf8PathBuf};
use std::io;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("vsix-downloader/", env!("CARGO_PKG_VERSION"));

/// Suffix of the raw payload written next to the final artefact.
pub const DOWNLOAD_SUFFIX: &str = ".download";

/// Suffix of the normalized archive written next to the final artefact.
pub const NORMALIZED_SUFFIX: &str = ".normalized.zip";

/// Settings for a [`Downloader`](crate::pipeline::Downloader).
///
/// # Examples
///
/// ```
/// use vsix_downloader::config::DownloadConfig;
///
/// let config = DownloadConfig::default()
///     .with_dest_dir("vscode_exts")
///     .with_repack(false);
/// assert!(!config.repack);
/// assert_eq!(config.dest_dir.as_deref().map(|dir| dir.as_str()), Some("vscode_exts"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Destination directory; `None` means the current working directory.
    pub dest_dir: Option<Utf8PathBuf>,
    /// Re-encode the normalized archive into a fresh container.
    pub repack: bool,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Gallery API endpoint that download URLs are built from.
    pub base_url: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dest_dir: None,
            repack: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            base_url: MARKETPLACE_BASE_URL.to_owned(),
        }
    }
}

impl DownloadConfig {
    /// Set the destination directory.
    #[must_use]
    pub fn with_dest_dir(mut self, dest_dir: impl Into<Utf8PathBuf>) -> Self {
        self.dest_dir = Some(dest_dir.into());
        self
    }

    /// Enable or disable repacking.
    #[must_use]
    pub const fn with_repack(mut self, repack: bool) -> Self {
        self.repack = repack;
        self
    }

    /// Set the `User-Agent` header value.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the gallery API endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The destination directory, falling back to the working directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the working directory cannot be determined or
    /// is not valid UTF-8.
    pub fn resolve_dest_dir(&self) -> io::Result<Utf8PathBuf> {
        if let Some(dir) = &self.dest_dir {
            return Ok(dir.clone());
        }
        let cwd = std::env::current_dir()?;
        Utf8PathBuf::try_from(cwd).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("working directory is not valid UTF-8: {err}"),
            )
        })
    }
}

/// The three files one download touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// The final `.vsix` artefact.
    pub final_path: Utf8PathBuf,
    /// The raw payload as received.
    pub download: Utf8PathBuf,
    /// The normalized ZIP archive.
    pub normalized: Utf8PathBuf,
}

impl ArtifactPaths {
    /// Lay out the paths for `filename` inside `dest_dir`.
    #[must_use]
    pub fn new(dest_dir: &Utf8Path, filename: &str) -> Self {
        let final_path = dest_dir.join(filename);
        Self {
            download: Utf8PathBuf::from(format!("{final_path}{DOWNLOAD_SUFFIX}")),
            normalized: Utf8PathBuf::from(format!("{final_path}{NORMALIZED_SUFFIX}")),
            final_path,
        }
    }

    /// The intermediate files, in creation order.
    #[must_use]
    pub fn intermediates(&self) -> [&Utf8Path; 2] {
        [&self.download, &self.normalized]
    }
}
