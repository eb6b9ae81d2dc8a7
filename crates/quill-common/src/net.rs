//! Resource fetching for the rewriter.
//!
//! The CSS summary filters need the bytes of external stylesheets. Fetching is
//! an external collaborator reached through the [`UrlFetcher`] trait so hosts
//! can plug in their own HTTP layer. Three implementations ship here:
//! - [`HttpFetcher`] - blocking `reqwest` client
//! - [`MockFetcher`] - in-memory fixtures for tests and the CLI
//! - `data:` URLs are decoded inline by every fetcher through [`DataUrl`]

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use ::url::Url;
use base64::Engine;
use thiserror::Error;

/// User-Agent header sent with all requests.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; quill-rewriter/0.1)";

/// Default request timeout.
const TIMEOUT: Duration = Duration::from_secs(30);

/// Errors reported by a [`UrlFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not be made or the connection failed.
    #[error("request for {url} failed: {reason}")]
    Network {
        /// URL that was requested.
        url: String,
        /// Transport-level reason.
        reason: String,
    },
    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// URL that was requested.
        url: String,
        /// Status code returned.
        status: u16,
    },
    /// A `data:` URL could not be decoded.
    #[error("invalid data URL: {0}")]
    DataUrl(String),
    /// No resource is known for the URL.
    #[error("no resource for {0}")]
    NotFound(String),
    /// The URL's host is not authorized for rewriting.
    #[error("{0} is not on an authorized domain")]
    Unauthorized(String),
}

/// Bytes of a fetched resource plus the response content type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchedResource {
    /// Response body.
    pub body: Vec<u8>,
    /// `Content-Type` header value, when the server sent one.
    pub content_type: Option<String>,
}

impl FetchedResource {
    /// A resource with the given body and content type.
    #[must_use]
    pub fn new(body: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.map(str::to_string),
        }
    }
}

/// Fetch collaborator used by the CSS summary base.
///
/// Implementations must be safe to share between concurrent parses.
pub trait UrlFetcher: Send + Sync {
    /// Produce the bytes of an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the resource is unavailable.
    fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError>;
}

/// A parsed `data:` URL that can be decoded into raw bytes.
///
/// [RFC 2397](https://www.rfc-editor.org/rfc/rfc2397)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Media type and parameters before the comma, without `;base64`.
    pub metadata: String,
    /// Whether the payload is base64-encoded.
    pub base64: bool,
    /// Raw payload after the comma.
    pub payload: String,
}

impl DataUrl {
    /// Split a raw `data:` URL into its parts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::DataUrl`] when the scheme or the comma is missing.
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let Some(rest) = raw.strip_prefix("data:") else {
            return Err(FetchError::DataUrl("missing data: scheme".to_string()));
        };
        let Some((metadata, payload)) = rest.split_once(',') else {
            return Err(FetchError::DataUrl("missing comma".to_string()));
        };
        let (metadata, base64) = metadata
            .strip_suffix(";base64")
            .map_or((metadata, false), |m| (m, true));
        Ok(Self {
            metadata: metadata.to_string(),
            base64,
            payload: payload.to_string(),
        })
    }

    /// Decode the payload into raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::DataUrl`] if base64 or percent decoding fails.
    pub fn decode(&self) -> Result<Vec<u8>, FetchError> {
        if self.base64 {
            base64::engine::general_purpose::STANDARD
                .decode(self.payload.as_bytes())
                .map_err(|e| FetchError::DataUrl(format!("base64 decode error: {e}")))
        } else {
            percent_decode(&self.payload)
        }
    }

    /// The media type, defaulting to `text/plain` per RFC 2397.
    #[must_use]
    pub fn content_type(&self) -> &str {
        if self.metadata.is_empty() {
            "text/plain"
        } else {
            &self.metadata
        }
    }
}

fn percent_decode(payload: &str) -> Result<Vec<u8>, FetchError> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = payload
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| FetchError::DataUrl(format!("bad percent escape at {i}")))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn fetch_data_url(url: &Url) -> Result<FetchedResource, FetchError> {
    let data_url = DataUrl::parse(url.as_str())?;
    let body = data_url.decode()?;
    Ok(FetchedResource::new(body, Some(data_url.content_type())))
}

/// Blocking HTTP fetcher backed by `reqwest`.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] if the HTTP client cannot be created.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl UrlFetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        if url.scheme() == "data" {
            return fetch_data_url(url);
        }
        let network_error = |e: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url.as_str())
            .send()
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().map_err(network_error)?;
        Ok(FetchedResource {
            body: body.to_vec(),
            content_type,
        })
    }
}

/// In-memory fetcher serving registered fixtures.
///
/// Also counts requests per URL so tests can assert on cache behavior.
#[derive(Default)]
pub struct MockFetcher {
    resources: Mutex<HashMap<String, FetchedResource>>,
    requests: Mutex<HashMap<String, usize>>,
}

impl MockFetcher {
    /// An empty fetcher; every non-`data:` request fails with `NotFound`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with `content_type` for `url`.
    pub fn insert(&self, url: &str, body: impl Into<Vec<u8>>, content_type: Option<&str>) {
        let _ = self
            .resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), FetchedResource::new(body, content_type));
    }

    /// Serve a stylesheet with content type `text/css`.
    pub fn insert_css(&self, url: &str, css: &str) {
        self.insert(url, css, Some("text/css"));
    }

    /// How many times `url` has been requested.
    #[must_use]
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .copied()
            .unwrap_or(0)
    }
}

impl UrlFetcher for MockFetcher {
    fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        if url.scheme() == "data" {
            return fetch_data_url(url);
        }
        *self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url.to_string())
            .or_insert(0) += 1;
        self.resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}
