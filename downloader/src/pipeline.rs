//! Download orchestration.
//!
//! A [`Downloader`] turns an [`ExtensionSpec`] into a `.vsix` file on disk:
//! it requests the package, streams the body to disk, strips any gzip layer,
//! validates the ZIP container, and either repacks or copies it into place.
//! Intermediate files live next to the final artefact and are removed once
//! it exists.

use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use std::fs;
use std::io;

use crate::atomic::{self, ReadChunks};
use crate::config::{ArtifactPaths, DownloadConfig};
use crate::error::Result;
use crate::filename::resolve_filename;
use crate::headers::ResponseHeaders;
use crate::normalize::normalize_payload;
use crate::repack::repack_archive;
use crate::spec::ExtensionSpec;
use crate::transport::{HttpRequest, Transport, TransportError, UreqTransport};
use crate::url::build_download_url;

/// Request header names sent with every download.
const USER_AGENT_HEADER: &str = "User-Agent";
const ACCEPT_ENCODING_HEADER: &str = "Accept-Encoding";

/// Downloads extensions using a configured [`Transport`].
///
/// # Examples
///
/// ```no_run
/// use vsix_downloader::config::DownloadConfig;
/// use vsix_downloader::pipeline::Downloader;
/// use vsix_downloader::spec::ExtensionSpec;
///
/// let downloader = Downloader::new(DownloadConfig::default().with_dest_dir("vscode_exts"));
/// let spec = ExtensionSpec::new("ms-vscode.cpptools", "1.30.0").with_platform("linux-x64");
/// let path = downloader.download(&spec)?;
/// println!("saved {path}");
/// # Ok::<(), vsix_downloader::error::VsixError>(())
/// ```
#[derive(Debug)]
pub struct Downloader<T = UreqTransport> {
    config: DownloadConfig,
    transport: T,
}

impl Downloader<UreqTransport> {
    /// Create a downloader backed by [`UreqTransport`].
    #[must_use]
    pub fn new(config: DownloadConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> Downloader<T> {
    /// Create a downloader that issues requests through `transport`.
    #[must_use]
    pub const fn with_transport(config: DownloadConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// The transport requests go through.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Download one extension and return the path of the final `.vsix`.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidSpec`](crate::error::VsixError::InvalidSpec)
    /// before any request is made if the identifier is malformed, with
    /// [`Transport`](crate::error::VsixError::Transport) for request failures
    /// and non-success statuses, with
    /// [`NotAnArchive`](crate::error::VsixError::NotAnArchive) when the
    /// payload is not a package, and with
    /// [`Filesystem`](crate::error::VsixError::Filesystem) for local I/O.
    /// The final artefact is only written once the payload has validated.
    pub fn download(&self, spec: &ExtensionSpec) -> Result<Utf8PathBuf> {
        // Step 1: Build the URL; malformed identifiers stop here.
        let url = build_download_url(spec, &self.config.base_url)?;
        let dest_dir = self.config.resolve_dest_dir()?;
        fs::create_dir_all(&dest_dir)?;

        // Step 2: Request the package and stream it to disk.
        let (paths, headers) = self.fetch(spec, &url, &dest_dir)?;

        // Step 3: Strip any gzip layer and validate the container.
        let encoding = normalize_payload(&paths.download, &paths.normalized, &headers)?;
        info!("Normalized payload ({encoding:?}) into {}", paths.normalized);

        // Step 4: Repack or copy into the final location.
        if self.config.repack {
            repack_archive(&paths.normalized, &paths.final_path)?;
        } else {
            info!("Repacking disabled; copying normalized archive into place");
            atomic::copy_file(&paths.normalized, &paths.final_path)?;
        }

        // Step 5: Drop intermediates; failures here are not fatal.
        remove_intermediates(&paths);

        info!("Saved {} to {}", spec, paths.final_path);
        Ok(paths.final_path)
    }

    /// Download `specs` in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; later specs are not requested.
    pub fn download_many<'a, I>(&self, specs: I) -> Result<Vec<Utf8PathBuf>>
    where
        I: IntoIterator<Item = &'a ExtensionSpec>,
    {
        let specs: Vec<&ExtensionSpec> = specs.into_iter().collect();
        let total = specs.len();
        let mut saved = Vec::with_capacity(total);
        for (index, spec) in specs.into_iter().enumerate() {
            info!("({}/{total}) Downloading {spec}", index + 1);
            saved.push(self.download(spec)?);
        }
        Ok(saved)
    }

    /// Issue the request and write the raw body next to the final artefact.
    fn fetch(
        &self,
        spec: &ExtensionSpec,
        url: &str,
        dest_dir: &Utf8Path,
    ) -> Result<(ArtifactPaths, ResponseHeaders)> {
        let request = HttpRequest::get(url)
            .header(USER_AGENT_HEADER, self.config.user_agent.as_str())
            .header(ACCEPT_ENCODING_HEADER, "identity");
        info!("Requesting {url}");
        let response = self.transport.execute(&request)?;
        check_status(url, response.status())?;

        let headers = response.headers().clone();
        let filename = resolve_filename(spec, &headers);
        let paths = ArtifactPaths::new(dest_dir, filename.as_str());

        let body = ReadChunks::new(response.into_body()).map(|chunk| {
            chunk.map_err(|source| TransportError::Body {
                url: url.to_owned(),
                source,
            })
        });
        let written = atomic::write_chunks(&paths.download, body)?;
        info!("Received {written} bytes into {}", paths.download);

        Ok((paths, headers))
    }
}

/// Reject non-2xx statuses, singling out 404.
fn check_status(url: &str, status: u16) -> std::result::Result<(), TransportError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(TransportError::NotFound {
            url: url.to_owned(),
        }),
        status => Err(TransportError::Status {
            url: url.to_owned(),
            status,
        }),
    }
}

/// Delete intermediate files, logging rather than failing.
fn remove_intermediates(paths: &ArtifactPaths) {
    for path in paths.intermediates() {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("Could not remove temporary file {path}: {err}"),
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
