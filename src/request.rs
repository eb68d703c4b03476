//! Request resolution: the step between the reactive option bags and one
//! wire request.
//!
//! A [`RequestContext`] is rebuilt from the current override values for
//! every execution, passed through the `on_request` hook chain (which may
//! mutate it), resolved into a [`HttpRequest`] and dispatched. The response
//! is parsed, mapped onto an error for non-success statuses, and handed to
//! the `on_response` hooks.

use crate::client::{HttpClient, HttpRequest, Method, RawResponse, ResponseType};
use crate::error::FetchError;
use crate::options::TransportOptions;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered query/params bag. Values render as unquoted strings for string
/// values and as their JSON form otherwise.
pub type QueryMap = IndexMap<String, Value>;

/// Ordered header bag.
pub type HeaderMap = IndexMap<String, String>;

/// Mutable request state visible to `on_request` hooks.
pub struct RequestContext {
    /// Request target: absolute, or relative to `base_url`.
    pub url: String,
    /// Request method.
    pub method: Method,
    /// Base URL joined in front of a relative target.
    pub base_url: Option<String>,
    /// Query parameters.
    pub query: QueryMap,
    /// Additional parameters, merged under the query (query wins on
    /// duplicate keys).
    pub params: QueryMap,
    /// Outgoing headers.
    pub headers: HeaderMap,
    /// JSON body, encoded at dispatch time.
    pub body: Option<Value>,
}

/// Response state visible to `on_response` / `on_response_error` hooks.
pub struct ResponseContext {
    /// The URL the request was sent to.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Status reason phrase.
    pub status_text: String,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Parsed body.
    pub body: Value,
}

/// Hook run before dispatch; may mutate the request.
pub type OnRequest = Arc<dyn Fn(&mut RequestContext) -> Result<(), FetchError> + Send + Sync>;
/// Observer run when the request could not be dispatched.
pub type OnRequestError = Arc<dyn Fn(&RequestContext, &FetchError) + Send + Sync>;
/// Hook run on a successful response; may mutate the parsed body.
pub type OnResponse = Arc<dyn Fn(&mut ResponseContext) -> Result<(), FetchError> + Send + Sync>;
/// Observer run when the response mapped to an error status.
pub type OnResponseError = Arc<dyn Fn(&ResponseContext, &FetchError) + Send + Sync>;

/// Lifecycle hook lists. Hooks compose: injected hooks and caller hooks are
/// concatenated, never overwritten.
#[derive(Clone, Default)]
pub struct FetchHooks {
    /// Before dispatch, in order.
    pub on_request: Vec<OnRequest>,
    /// Dispatch failures.
    pub on_request_error: Vec<OnRequestError>,
    /// Successful responses, in order.
    pub on_response: Vec<OnResponse>,
    /// Error-status responses.
    pub on_response_error: Vec<OnResponseError>,
}

impl FetchHooks {
    /// True when no hook of any kind is registered.
    pub fn is_empty(&self) -> bool {
        self.on_request.is_empty()
            && self.on_request_error.is_empty()
            && self.on_response.is_empty()
            && self.on_response_error.is_empty()
    }
}

/// Run one request through hooks, transport and parsing.
pub(crate) fn perform(
    client: &dyn HttpClient,
    mut ctx: RequestContext,
    transport: &TransportOptions,
) -> Result<Value, FetchError> {
    let hooks = &transport.hooks;

    for hook in &hooks.on_request {
        if let Err(error) = hook(&mut ctx) {
            warn!(url = %ctx.url, error = %error, "request hook failed");
            for observer in &hooks.on_request_error {
                observer(&ctx, &error);
            }
            return Err(error);
        }
    }

    let url = resolve_url(&ctx);
    let (body, content_type) = encode_body(&ctx);
    let mut headers = ctx.headers.clone();
    if let Some(content_type) = content_type {
        if header_value(&headers, "content-type").is_none() {
            headers.insert("Content-Type".to_owned(), content_type);
        }
    }

    debug!(method = %ctx.method, url = %url, "dispatching request");
    let request = HttpRequest {
        method: ctx.method,
        url: url.clone(),
        headers,
        body,
        timeout: transport.timeout,
    };

    let raw = match client.send(&request) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(url = %url, error = %error, "transport failure");
            for observer in &hooks.on_request_error {
                observer(&ctx, &error);
            }
            return Err(error);
        }
    };

    let response_type = transport.response_type.unwrap_or_default();
    let mut response = ResponseContext {
        url: url.clone(),
        status: raw.status,
        status_text: raw.status_text.clone(),
        headers: raw.headers.clone(),
        body: parse_body(&raw, response_type),
    };

    if !raw.is_success() && !transport.ignore_response_error.unwrap_or(false) {
        let error = FetchError::Status {
            method: ctx.method,
            url,
            status: raw.status,
            status_text: raw.status_text,
        };
        warn!(error = %error, "response error");
        for observer in &hooks.on_response_error {
            observer(&response, &error);
        }
        return Err(error);
    }

    for hook in &hooks.on_response {
        hook(&mut response)?;
    }
    Ok(response.body)
}

/// Join the base URL and append the merged query string.
fn resolve_url(ctx: &RequestContext) -> String {
    let mut url = match &ctx.base_url {
        Some(base) if !is_absolute(&ctx.url) => join_url(base, &ctx.url),
        _ => ctx.url.clone(),
    };

    let mut merged: QueryMap = ctx.params.clone();
    for (key, value) in &ctx.query {
        merged.insert(key.clone(), value.clone());
    }
    if !merged.is_empty() {
        url.push(if url.contains('?') { '&' } else { '?' });
        let mut first = true;
        for (key, value) in &merged {
            if value.is_null() {
                continue;
            }
            if !first {
                url.push('&');
            }
            first = false;
            url.push_str(&percent_encode(key));
            url.push('=');
            url.push_str(&percent_encode(&query_value(value)));
        }
    }
    url
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Render a query value: strings stay raw, everything else uses its JSON
/// form.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => {
                out.push('%');
                out.push_str(&format!("{other:02X}"));
            }
        }
    }
    out
}

/// Encode the body, honouring a caller-declared form content type.
///
/// A JSON object sent with `application/x-www-form-urlencoded` is re-encoded
/// as a form; everything else is serialized as JSON.
fn encode_body(ctx: &RequestContext) -> (Option<Vec<u8>>, Option<String>) {
    let Some(body) = &ctx.body else {
        return (None, None);
    };

    let declared = header_value(&ctx.headers, "content-type");
    if let (Some(content_type), Value::Object(map)) = (declared, body) {
        if content_type.contains("application/x-www-form-urlencoded") {
            let encoded = map
                .iter()
                .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(&query_value(v))))
                .collect::<Vec<_>>()
                .join("&");
            return (Some(encoded.into_bytes()), None);
        }
    }

    let bytes = serde_json::to_vec(body).unwrap_or_default();
    (Some(bytes), Some("application/json".to_owned()))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn parse_body(raw: &RawResponse, response_type: ResponseType) -> Value {
    let text = || String::from_utf8_lossy(&raw.body).into_owned();
    match response_type {
        ResponseType::Text => Value::String(text()),
        ResponseType::Json => {
            serde_json::from_slice(&raw.body).unwrap_or_else(|_| Value::String(text()))
        }
    }
}
