//! Response handling and transformation.
//!
//! # Responsibilities
//! - Map relay failures to HTTP status codes
//! - Tell an oversized request body apart from a broken one
//! - Strip hop-by-hop headers before a message is re-framed

use axum::http::header::{HeaderName, CONNECTION, CONTENT_LENGTH, TE, TRAILER, TRANSFER_ENCODING, UPGRADE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use thiserror::Error;

const HOP_BY_HOP: [HeaderName; 7] = [
    CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    TRANSFER_ENCODING,
    UPGRADE,
    TE,
    TRAILER,
];

/// Failure while relaying a device request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Failed to read request body: {0}")]
    RequestBody(axum::Error),

    #[error("Request body exceeds the configured limit")]
    PayloadTooLarge,

    #[error("Missing Host header")]
    MissingHost,

    #[error("Invalid upstream URI: {0}")]
    InvalidUri(#[from] axum::http::uri::InvalidUri),

    #[error("Failed to build upstream request: {0}")]
    Build(#[from] axum::http::Error),

    #[error("Upstream error: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("Upstream error: failed to read response body: {0}")]
    UpstreamBody(axum::Error),
}

impl ProxyError {
    /// Wrap a failed request-body read.
    pub fn request_body(error: axum::Error) -> Self {
        if exceeds_limit(&error) {
            ProxyError::PayloadTooLarge
        } else {
            ProxyError::RequestBody(error)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::RequestBody(_) | ProxyError::MissingHost | ProxyError::InvalidUri(_) => {
                StatusCode::BAD_REQUEST
            }
            ProxyError::Build(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Upstream(_) | ProxyError::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

// The limit error may sit several layers down: axum wraps the body, and
// tower-http may already have wrapped it in its own limit.
fn exceeds_limit(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

/// Remove connection-scoped headers, including those named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| name.trim().parse().ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// [`strip_hop_by_hop`] plus `Content-Length`, for bodies that were buffered
/// and will be framed again.
pub fn strip_for_reframe(headers: &mut HeaderMap) {
    strip_hop_by_hop(headers);
    headers.remove(CONTENT_LENGTH);
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive, x-private"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-private", HeaderValue::from_static("1"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("10"));
        headers.insert("content-type", HeaderValue::from_static("text/xml"));

        strip_for_reframe(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers["content-type"], "text/xml");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ProxyError::MissingHost.status(), StatusCode::BAD_REQUEST);
        let response = ProxyError::MissingHost.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_body_over_limit_is_payload_too_large() {
        let error = axum::body::to_bytes(Body::from("x".repeat(64)), 16)
            .await
            .unwrap_err();
        let error = ProxyError::request_body(error);
        assert!(matches!(error, ProxyError::PayloadTooLarge));
        assert_eq!(error.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_other_body_errors_stay_bad_request() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let error = ProxyError::request_body(axum::Error::new(io));
        assert!(matches!(error, ProxyError::RequestBody(_)));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }
}
