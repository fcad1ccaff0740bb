//! HTTP transport seam and its `reqwest` implementation.
#![allow(clippy::future_not_send)]

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Method};
use url::Url;

/// Boxed underlying cause of a transport failure.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A request handed to the transport.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: String,
    /// Optional JSON body (sent for DELETE as well as POST).
    pub body: Option<serde_json::Value>,
}

impl TransportRequest {
    /// GET without a body.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
        }
    }

    /// POST with a JSON body.
    #[must_use]
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: Some(body),
        }
    }

    /// DELETE with a JSON body.
    #[must_use]
    pub fn delete(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::DELETE,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Raw response body.
    pub body: String,
}

/// The request that left the process, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    /// HTTP method.
    pub method: String,
    /// Request URL.
    pub url: String,
}

impl RequestSummary {
    /// Creates a summary from a method and URL.
    #[must_use]
    pub fn new(method: &Method, url: impl Into<String>) -> Self {
        Self {
            method: method.to_string(),
            url: url.into(),
        }
    }
}

impl fmt::Display for RequestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A non-2xx response received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Raw response body.
    pub body: String,
}

/// Transport failure.
///
/// Which of `request` and `response` are populated tells how far the round
/// trip got: both for a server rejection, only `request` when no reply
/// arrived, neither when the request was never sent.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
#[allow(clippy::module_name_repetitions)]
pub struct TransportError {
    message: String,
    request: Option<RequestSummary>,
    response: Option<ErrorResponse>,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    /// The server answered with a non-2xx status.
    #[must_use]
    pub fn rejected(request: RequestSummary, response: ErrorResponse) -> Self {
        Self {
            message: format!("Request failed with status code {}", response.status),
            request: Some(request),
            response: Some(response),
            source: None,
        }
    }

    /// The request was sent but no response came back.
    #[must_use]
    pub fn unreachable(request: RequestSummary, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self {
            message: format!("{request} failed: {source}"),
            request: Some(request),
            response: None,
            source: Some(source),
        }
    }

    /// The request could not be built, so nothing was sent.
    #[must_use]
    pub fn setup(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self {
            message: message.into(),
            request: None,
            response: None,
            source,
        }
    }

    /// Outgoing request, if one was sent.
    #[must_use]
    pub const fn request(&self) -> Option<&RequestSummary> {
        self.request.as_ref()
    }

    /// Server response, if one was received.
    #[must_use]
    pub const fn response(&self) -> Option<&ErrorResponse> {
        self.response.as_ref()
    }

    /// HTTP status of the server response, if one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }
}

/// Transport trait.
///
/// Abstracts the HTTP round trip for substitution in tests.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Performs one round trip. Non-2xx responses are failures.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` describing how far the request got.
    async fn send(&self, request: TransportRequest)
    -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct HttpTransport {
    /// HTTP client (reqwest, gzip enabled).
    http_client: Client,
}

impl HttpTransport {
    /// Creates a transport with the given User-Agent and optional timeout.
    ///
    /// Without a timeout a hanging backend hangs the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the `reqwest::Client` build fails.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(user_agent).gzip(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().context("failed to build HTTP client")?;
        Ok(Self { http_client })
    }

    /// Builds the `reqwest` request. Failures here mean nothing was sent.
    fn build_request(
        &self,
        request: &TransportRequest,
    ) -> Result<(reqwest::Request, RequestSummary), TransportError> {
        let url = Url::parse(&request.url).map_err(|e| {
            TransportError::setup(
                format!("invalid request URL `{}`: {e}", request.url),
                Some(e.into()),
            )
        })?;
        let summary = RequestSummary::new(&request.method, url.as_str());

        let mut builder = self.http_client.request(request.method.clone(), url);
        if let Some(ref body) = request.body {
            let bytes = serde_json::to_vec(body).map_err(|e| {
                TransportError::setup(
                    format!("failed to serialize request body: {e}"),
                    Some(e.into()),
                )
            })?;
            builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
        }

        let built = builder.build().map_err(|e| {
            TransportError::setup(format!("failed to build request: {e}"), Some(e.into()))
        })?;
        Ok((built, summary))
    }
}

/// Flattens response headers into a name/value map.
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

impl LocalTransport for HttpTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let (http_request, summary) = self.build_request(&request)?;

        tracing::debug!(method = %summary.method, url = %summary.url, "Booking API request");

        let response = self
            .http_client
            .execute(http_request)
            .await
            .map_err(|e| TransportError::unreachable(summary.clone(), e))?;

        let status = response.status();
        let headers = collect_headers(response.headers());
        tracing::trace!(%status, ?headers, "Response headers");

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::unreachable(summary.clone(), e))?;
        tracing::debug!(%status, body_len = body.len(), "Response body received");

        if !status.is_success() {
            return Err(TransportError::rejected(
                summary,
                ErrorResponse {
                    status: status.as_u16(),
                    headers,
                    body,
                },
            ));
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}
