//! HTTP transport abstraction.
//!
//! The pipeline never talks to the network directly. It hands an
//! [`HttpRequest`] to a [`Transport`] and gets back an [`HttpResponse`] with a
//! status, headers, and a readable body. Production code uses
//! [`UreqTransport`]; tests supply closures or mocks instead.

use crate::headers::ResponseHeaders;
use std::fmt;
use std::io::Read;
use std::time::Duration;

/// Default global timeout applied by [`UreqTransport::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors reported by a [`Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be completed (connection, TLS, redirect loop).
    #[error("request failed for {url}: {reason}")]
    Request {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The server answered 404.
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The server answered with a non-success status other than 404.
    #[error("unexpected HTTP status {status} for {url}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The status code returned.
        status: u16,
    },

    /// Reading the response body failed mid-stream.
    #[error("failed reading response body from {url}: {source}")]
    Body {
        /// The URL whose body was being read.
        url: String,
        /// The underlying read error.
        #[source]
        source: std::io::Error,
    },
}

/// A GET request descriptor.
///
/// # Examples
///
/// ```
/// use vsix_downloader::transport::HttpRequest;
///
/// let request = HttpRequest::get("https://example.test/pkg").header("User-Agent", "demo/1.0");
/// assert_eq!(request.header_value("user-agent"), Some("demo/1.0"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    url: String,
    headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Start a GET request for `url`.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Add a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request headers in insertion order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// The first value of header `name`, ignoring ASCII case.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }
}

/// A response descriptor with a streaming body.
pub struct HttpResponse {
    status: u16,
    headers: ResponseHeaders,
    body: Box<dyn Read>,
}

impl HttpResponse {
    /// Assemble a response from its parts.
    pub fn new(status: u16, headers: ResponseHeaders, body: impl Read + 'static) -> Self {
        Self {
            status,
            headers,
            body: Box::new(body),
        }
    }

    /// The HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// The response headers.
    #[must_use]
    pub const fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// Consume the response, keeping only the body reader.
    #[must_use]
    pub fn into_body(self) -> Box<dyn Read> {
        self.body
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Executes HTTP requests on behalf of the pipeline.
///
/// Implementations follow redirects and report connection-level failures
/// as [`TransportError`]. Any `Fn(&HttpRequest) -> Result<HttpResponse, _>`
/// closure is a transport, which keeps test doubles short.
///
/// # Examples
///
/// ```
/// use vsix_downloader::headers::ResponseHeaders;
/// use vsix_downloader::transport::{HttpRequest, HttpResponse, Transport, TransportError};
///
/// let transport = |_: &HttpRequest| -> Result<HttpResponse, TransportError> {
///     Ok(HttpResponse::new(200, ResponseHeaders::new(), &b""[..]))
/// };
/// let response = transport.execute(&HttpRequest::get("https://example.test")).expect("stub");
/// assert!(response.is_success());
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Perform `request` and return the response head with a readable body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request cannot be completed.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError>,
{
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Create a transport with [`DEFAULT_TIMEOUT`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Some(DEFAULT_TIMEOUT))
    }

    /// Create a transport with an explicit global timeout (`None` disables it).
    #[must_use]
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url();
        let mut builder = self.agent.get(url);
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }
        let response = builder.call().map_err(|e| map_ureq_error(url, &e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.into_body().into_reader();
        Ok(HttpResponse::new(status, headers, body))
    }
}

/// Map a ureq error to a [`TransportError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> TransportError {
    match err {
        ureq::Error::StatusCode(404) => TransportError::NotFound {
            url: url.to_owned(),
        },
        ureq::Error::StatusCode(status) => TransportError::Status {
            url: url.to_owned(),
            status: *status,
        },
        other => TransportError::Request {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
