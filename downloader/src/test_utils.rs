//! Shared test utilities for the downloader crate.
//!
//! Provides in-memory archive fixtures and a scripted [`Transport`] so tests
//! can drive the pipeline without network access.

use crate::headers::ResponseHeaders;
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Build a deflated ZIP archive from `(name, contents)` pairs.
///
/// Names ending in `/` become directory entries.
///
/// # Panics
///
/// Panics if the in-memory archive cannot be written.
#[must_use]
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, contents) in entries {
        if name.ends_with('/') {
            fixture(writer.add_directory(*name, options), "add directory entry");
        } else {
            fixture(writer.start_file(*name, options), "start zip entry");
            fixture(writer.write_all(contents), "write zip entry");
        }
    }
    fixture(writer.finish(), "finish zip").into_inner()
}

/// Unwrap a fixture step, panicking with `context` on failure.
fn fixture<T, E: fmt::Display>(result: Result<T, E>, context: &str) -> T {
    result.unwrap_or_else(|err| panic!("{context}: {err}"))
}

/// A minimal VSIX-shaped archive.
#[must_use]
pub fn minimal_vsix() -> Vec<u8> {
    zip_bytes(&[
        ("extension/", b"".as_slice()),
        (
            "extension/package.json",
            b"{\"name\":\"pkg\",\"publisher\":\"pub\",\"version\":\"1.0.0\"}".as_slice(),
        ),
        (
            "extension.vsixmanifest",
            b"<PackageManifest Version=\"2.0.0\"/>".as_slice(),
        ),
        ("[Content_Types].xml", b"<Types/>".as_slice()),
    ])
}

/// Gzip-compress `bytes`.
///
/// # Panics
///
/// Panics if the in-memory encoder fails.
#[must_use]
pub fn gzip_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    fixture(encoder.write_all(bytes), "gzip write");
    fixture(encoder.finish(), "gzip finish")
}

/// Read every entry of an in-memory archive as `(name, contents)` pairs.
///
/// Directory entries are reported with empty contents.
///
/// # Panics
///
/// Panics if `bytes` is not a readable ZIP archive.
#[must_use]
pub fn read_zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = fixture(ZipArchive::new(Cursor::new(bytes)), "readable zip");
    (0..archive.len())
        .map(|index| {
            let mut entry = fixture(archive.by_index(index), "zip entry");
            let mut contents = Vec::new();
            fixture(entry.read_to_end(&mut contents), "zip entry contents");
            (entry.name().to_owned(), contents)
        })
        .collect()
}

/// A scripted reply for [`StubTransport`].
#[derive(Debug)]
pub enum StubReply {
    /// Answer with a response.
    Response {
        /// HTTP status code.
        status: u16,
        /// Response headers.
        headers: Vec<(String, String)>,
        /// Response body.
        body: Vec<u8>,
    },
    /// Fail the request.
    Failure(TransportError),
}

impl StubReply {
    /// A `200 OK` reply with `body` and no headers.
    #[must_use]
    pub const fn ok(body: Vec<u8>) -> Self {
        Self::Response {
            status: 200,
            headers: Vec::new(),
            body,
        }
    }

    /// A reply with an explicit status and no body.
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self::Response {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Add a response header to a [`StubReply::Response`].
    #[must_use]
    pub fn with_header(self, name: &str, value: &str) -> Self {
        match self {
            Self::Response {
                status,
                mut headers,
                body,
            } => {
                headers.push((name.to_owned(), value.to_owned()));
                Self::Response {
                    status,
                    headers,
                    body,
                }
            }
            failure @ Self::Failure(_) => failure,
        }
    }
}

/// A [`Transport`] that replays scripted replies and records requests.
///
/// Replies are consumed in order; a request with no reply left fails with
/// [`TransportError::Request`].
#[derive(Debug, Default)]
pub struct StubTransport {
    replies: RefCell<VecDeque<StubReply>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl StubTransport {
    /// Create a transport answering with `replies` in order.
    #[must_use]
    pub fn new(replies: Vec<StubReply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    /// Number of replies not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl Transport for StubTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        let Some(reply) = self.replies.borrow_mut().pop_front() else {
            return Err(TransportError::Request {
                url: request.url().to_owned(),
                reason: "no scripted reply left".to_owned(),
            });
        };
        match reply {
            StubReply::Response {
                status,
                headers,
                body,
            } => Ok(HttpResponse::new(
                status,
                ResponseHeaders::from_pairs(headers),
                Cursor::new(body),
            )),
            StubReply::Failure(err) => Err(err),
        }
    }
}

/// A reader that yields `good` bytes of `fill` and then fails.
#[derive(Debug)]
pub struct FailingReader {
    remaining: usize,
    fill: u8,
}

impl FailingReader {
    /// Yield `good` bytes before failing.
    #[must_use]
    pub const fn new(good: usize, fill: u8) -> Self {
        Self {
            remaining: good,
            fill,
        }
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ));
        }
        let len = buf.len().min(self.remaining);
        buf.iter_mut().take(len).for_each(|byte| *byte = self.fill);
        self.remaining -= len;
        Ok(len)
    }
}
