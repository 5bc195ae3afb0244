//! VSIX downloader library.
//!
//! This crate fetches VS Code extension packages from the Visual Studio
//! Marketplace and turns whatever the server sends into a clean `.vsix` file
//! on disk. It is used by the `vsix-downloader` CLI binary and can be driven
//! programmatically with an injected [`transport::Transport`].
//!
//! # Modules
//!
//! - [`atomic`] - Streaming writes that land via rename
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Download configuration and artefact path layout
//! - [`error`] - Error types for the download pipeline
//! - [`filename`] - Output filename resolution and sanitization
//! - [`headers`] - Ordered, case-insensitive response headers
//! - [`normalize`] - Gzip unwrapping and ZIP validation
//! - [`output`] - User-facing CLI output
//! - [`pipeline`] - Single and batch download orchestration
//! - [`preview`] - Escaped previews of payload bytes for diagnostics
//! - [`repack`] - Canonical re-encoding of ZIP containers
//! - [`spec`] - Extension identifiers, versions, and platforms
//! - [`transport`] - HTTP transport abstraction and the `ureq` backend
//! - [`url`] - Marketplace download URL construction

pub mod atomic;
pub mod cli;
pub mod config;
pub mod error;
pub mod filename;
pub mod headers;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod repack;
pub mod spec;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod transport;
pub mod url;
