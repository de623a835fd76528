//! Request correlation ids.
//!
//! Every request gets an id, taken from `X-Request-ID` when the caller sends
//! a usable one. The id is attached to the request span, so logs emitted while
//! syncing or dispatching on behalf of a request carry it, and it is echoed
//! back on the response.

use std::fmt;
use std::time::Instant;

use axum::{
    body::Body,
    http::{header::HeaderName, Extensions, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Caller-supplied ids longer than this are replaced.
const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// Reuse the caller's id when it is printable and reasonably short.
    fn from_request(req: &Request<Body>) -> Self {
        let supplied = req
            .headers()
            .get(&REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN);

        match supplied {
            Some(id) => Self(id.to_string()),
            None => Self(Uuid::new_v4().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub async fn trace_id(mut req: Request<Body>, next: Next) -> Response {
    let request_id = RequestId::from_request(&req);
    req.extensions_mut().insert(request_id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let started = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        );
    });

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID.clone(), value);
    }

    response
}

/// Id of the current request, or `-` outside the middleware.
pub fn get_request_id(extensions: &Extensions) -> &str {
    extensions
        .get::<RequestId>()
        .map(RequestId::as_str)
        .unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_header(value: &str) -> Request<Body> {
        Request::builder()
            .uri("/api/v1/sync")
            .header(REQUEST_ID_HEADER, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_request_id_outside_middleware() {
        assert_eq!(get_request_id(&Extensions::new()), "-");
    }

    #[test]
    fn test_request_id_from_extensions() {
        let mut extensions = Extensions::new();
        extensions.insert(RequestId("sync-7".to_string()));
        assert_eq!(get_request_id(&extensions), "sync-7");
    }

    #[test]
    fn test_supplied_id_is_trimmed() {
        let id = RequestId::from_request(&request_with_header(" sync-42 "));
        assert_eq!(id.as_str(), "sync-42");
    }

    #[test]
    fn test_blank_or_oversized_id_is_replaced() {
        let blank = RequestId::from_request(&request_with_header("  "));
        assert!(Uuid::parse_str(blank.as_str()).is_ok());

        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let replaced = RequestId::from_request(&request_with_header(&long));
        assert_ne!(replaced.as_str(), long);
    }
}
