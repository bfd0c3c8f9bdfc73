//! Request identification and query parsing.
//!
//! Every request gets an `x-request-id` as early as possible so the trace
//! span and the response both carry it. A caller-supplied ID is kept.

use axum::http::{HeaderMap, HeaderName, Request};
use serde::Deserialize;
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::imaging::ImageRole;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

/// Read the request ID set by the layer, if any.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Query string of `GET <endpoint>?url=..&type=..`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageQuery {
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ImageQuery {
    /// Role named by `type`, `Backdrop` when absent or unknown.
    pub fn role(&self) -> ImageRole {
        ImageRole::parse_or_default(self.kind.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_request_id_is_uuid() {
        let request = Request::builder().uri("/").body(()).unwrap();
        let id = MakeRequestUuidV4.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(text).is_ok());
    }

    #[test]
    fn test_request_id_lookup() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");
        headers.insert(X_REQUEST_ID, "abc-123".parse().unwrap());
        assert_eq!(request_id(&headers), "abc-123");
    }

    #[test]
    fn test_query_role_defaults() {
        let query = ImageQuery {
            url: Some("https://img.example.com/a.jpg".into()),
            kind: None,
        };
        assert_eq!(query.role(), ImageRole::Backdrop);

        let query = ImageQuery {
            kind: Some("Primary".into()),
            ..query
        };
        assert_eq!(query.role(), ImageRole::Cover);
    }
}
