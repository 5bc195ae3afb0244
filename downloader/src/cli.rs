//! CLI argument definitions for the VSIX downloader.
//!
//! This module defines the command-line interface using clap and maps the
//! parsed flags onto a [`DownloadConfig`]. It is separated from the binary
//! entrypoint so the mapping can be unit tested.

use crate::config::DownloadConfig;
use crate::spec::ExtensionSpec;
use crate::transport::DEFAULT_TIMEOUT;
use camino::Utf8PathBuf;
use clap::Parser;
use log::LevelFilter;
use std::time::Duration;

/// Destination directory used when `--dest-dir` is not given.
pub const DEFAULT_DEST_DIR: &str = "vscode_exts";

/// Download VS Code extension packages from the marketplace.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "vsix-downloader")]
#[command(version, about)]
#[command(long_about = concat!(
    "Download VS Code extension packages (.vsix) from the Visual Studio Marketplace.\n\n",
    "Each SPEC names one extension version as publisher.package@version, optionally ",
    "followed by @platform for platform-specific builds. Payloads are gzip-decoded when ",
    "needed, validated as ZIP containers, and repacked into a clean archive before being ",
    "moved into place.\n\n",
    "When no SPEC is given, a built-in example batch is downloaded.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Download the example batch into ./vscode_exts:\n",
    "    $ vsix-downloader\n\n",
    "  Download a platform-specific build:\n",
    "    $ vsix-downloader ms-vscode.cpptools@1.30.0@linux-x64\n\n",
    "  Download a universal package without repacking:\n",
    "    $ vsix-downloader --no-repack -d exts ms-python.black-formatter@2025.2.0\n",
))]
pub struct Cli {
    /// Extensions to download (`publisher.package@version[@platform]`).
    #[arg(value_name = "SPEC")]
    pub specs: Vec<ExtensionSpec>,

    /// Directory that receives the downloaded packages.
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_DEST_DIR)]
    pub dest_dir: Utf8PathBuf,

    /// Copy the normalized archive as-is instead of repacking it.
    #[arg(long)]
    pub no_repack: bool,

    /// Override the `User-Agent` request header.
    #[arg(long, value_name = "UA")]
    pub user_agent: Option<String>,

    /// Override the gallery API endpoint.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Overall request timeout in seconds (0 disables the timeout).
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only report errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Default for Cli {
    /// Matches the values clap produces for an empty command line.
    fn default() -> Self {
        Self {
            specs: Vec::new(),
            dest_dir: Utf8PathBuf::from(DEFAULT_DEST_DIR),
            no_repack: false,
            user_agent: None,
            base_url: None,
            timeout: DEFAULT_TIMEOUT.as_secs(),
            verbosity: 0,
            quiet: false,
        }
    }
}

impl Cli {
    /// Build the download configuration described by the flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsix_downloader::cli::Cli;
    ///
    /// let cli = Cli { no_repack: true, ..Cli::default() };
    /// let config = cli.download_config();
    /// assert!(!config.repack);
    /// ```
    #[must_use]
    pub fn download_config(&self) -> DownloadConfig {
        let mut config = DownloadConfig::default()
            .with_dest_dir(self.dest_dir.clone())
            .with_repack(!self.no_repack);
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.as_str());
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.as_str());
        }
        config
    }

    /// The specs to download, falling back to [`default_batch`].
    #[must_use]
    pub fn requested_specs(&self) -> Vec<ExtensionSpec> {
        if self.specs.is_empty() {
            default_batch()
        } else {
            self.specs.clone()
        }
    }

    /// Transport timeout; `None` when disabled with `--timeout 0`.
    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        match self.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Log level implied by `-q` and `-v`.
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// The example batch downloaded when no spec is given.
#[must_use]
pub fn default_batch() -> Vec<ExtensionSpec> {
    vec![ExtensionSpec::new("ms-vscode.cpptools", "1.30.0").with_platform("linux-x64")]
}
