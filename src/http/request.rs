//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) as early as possible
//! - Work out where a device request should be relayed to

use axum::http::header::{HeaderName, HOST};
use axum::http::{HeaderMap, HeaderValue, Request, Uri};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::config::UpstreamConfig;
use crate::http::response::ProxyError;

/// Header carrying the correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(id))
    }
}

/// The request's correlation ID, or `unknown`.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Absolute URI the request is relayed to.
///
/// A configured authority wins. Otherwise the device's `Host` header names
/// the upstream, falling back to the authority of an absolute-form target.
pub fn upstream_uri(uri: &Uri, headers: &HeaderMap, upstream: &UpstreamConfig) -> Result<Uri, ProxyError> {
    let authority = match &upstream.authority {
        Some(authority) => authority.clone(),
        None => headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .ok_or(ProxyError::MissingHost)?,
    };
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    Ok(format!("http://{}{}", authority, target).parse::<Uri>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_transparent_target() {
        let uri: Uri = "/systems/42/status?x=1".parse().unwrap();
        let target = upstream_uri(&uri, &host("www.api.ing.carrier.com"), &UpstreamConfig::default()).unwrap();
        assert_eq!(target.to_string(), "http://www.api.ing.carrier.com/systems/42/status?x=1");
    }

    #[test]
    fn test_fixed_authority_wins() {
        let uri: Uri = "/status".parse().unwrap();
        let upstream = UpstreamConfig {
            authority: Some("127.0.0.1:3000".into()),
        };
        let target = upstream_uri(&uri, &host("device.local"), &upstream).unwrap();
        assert_eq!(target.to_string(), "http://127.0.0.1:3000/status");
    }

    #[test]
    fn test_absolute_form_without_host() {
        let uri: Uri = "http://upstream.example:8080/time".parse().unwrap();
        let target = upstream_uri(&uri, &HeaderMap::new(), &UpstreamConfig::default()).unwrap();
        assert_eq!(target.to_string(), "http://upstream.example:8080/time");
    }

    #[test]
    fn test_missing_host() {
        let uri: Uri = "/status".parse().unwrap();
        let err = upstream_uri(&uri, &HeaderMap::new(), &UpstreamConfig::default()).unwrap_err();
        assert!(matches!(err, ProxyError::MissingHost));
    }

    #[test]
    fn test_request_id_generation() {
        let request = Request::new(());
        let id = MakeRequestUuidV4.make_request_id(&request).unwrap();
        let value = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(value).is_ok());

        assert_eq!(request_id(&HeaderMap::new()), "unknown");
    }
}
