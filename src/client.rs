//! Raw HTTP transport seam.
//!
//! The orchestration layer talks to HTTP through the [`HttpClient`] trait:
//! a fully resolved wire request in, status plus headers plus body bytes
//! out. Error-status responses are *returned*, not raised, so the layer
//! above can honour `ignore_response_error` and run response hooks before
//! deciding. Only failures that produce no response at all are errors here.

use crate::error::FetchError;
use crate::request::HeaderMap;
use std::fmt;
use std::time::Duration;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// GET (default).
    #[default]
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
    /// HEAD.
    Head,
}

impl Method {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a response body is turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Parse as JSON, falling back to plain text when parsing fails.
    #[default]
    Json,
    /// Keep the body as a string.
    Text,
}

/// Fully resolved wire request.
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL with the query string already appended.
    pub url: String,
    /// Outgoing headers, in insertion order.
    pub headers: HeaderMap,
    /// Encoded body, if any.
    pub body: Option<Vec<u8>>,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

/// Raw response as produced by a transport.
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status reason phrase.
    pub status_text: String,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// True for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP transport.
///
/// Implementations perform exactly one request and do not retry; anything
/// beyond moving bytes lives above this trait.
pub trait HttpClient: Send + Sync {
    /// Perform `request`, returning the response even for error statuses.
    fn send(&self, request: &HttpRequest) -> Result<RawResponse, FetchError>;
}

/// [`HttpClient`] backed by a shared [`ureq::Agent`].
#[cfg(feature = "ureq")]
pub struct UreqClient {
    agent: ureq::Agent,
}

#[cfg(feature = "ureq")]
impl UreqClient {
    /// Client over an externally configured agent.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        UreqClient { agent }
    }
}

#[cfg(feature = "ureq")]
impl Default for UreqClient {
    fn default() -> Self {
        UreqClient {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

#[cfg(feature = "ureq")]
impl HttpClient for UreqClient {
    fn send(&self, request: &HttpRequest) -> Result<RawResponse, FetchError> {
        let mut req = self.agent.request(request.method.as_str(), &request.url);
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        let result = match &request.body {
            Some(bytes) => req.send_bytes(bytes),
            None => req.call(),
        };
        match result {
            Ok(response) => read_response(response),
            // keep error statuses as responses; the layer above maps them
            Err(ureq::Error::Status(_, response)) => read_response(response),
            Err(ureq::Error::Transport(transport)) => {
                Err(FetchError::Transport(transport.to_string()))
            }
        }
    }
}

#[cfg(feature = "ureq")]
fn read_response(response: ureq::Response) -> Result<RawResponse, FetchError> {
    use std::io::Read;

    let status = response.status();
    let status_text = response.status_text().to_owned();
    let headers = response
        .headers_names()
        .into_iter()
        .filter_map(|name| {
            response
                .header(&name)
                .map(|value| (name.clone(), value.to_owned()))
        })
        .collect();

    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    Ok(RawResponse {
        status,
        status_text,
        headers,
        body,
    })
}
