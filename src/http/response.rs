//! Response mapping.
//!
//! # Responsibilities
//! - Turn `ImageResponse` into an HTTP response (JPEG or upstream relay)
//! - Map `ProxyError` to status codes with a JSON error body
//!
//! # Design Decisions
//! - Upstream error statuses are relayed with their original body
//! - Transport exhaustion and undecodable images are 502 Bad Gateway
//! - A cancelled request answers 503; the client has usually gone by then

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::proxy::{ImageResponse, ProxyError, JPEG_CONTENT_TYPE};
use crate::resilience::TransportError;

impl IntoResponse for ImageResponse {
    fn into_response(self) -> Response {
        match self {
            ImageResponse::Image(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, HeaderValue::from_static(JPEG_CONTENT_TYPE))],
                body,
            )
                .into_response(),
            ImageResponse::Passthrough(upstream) => {
                let mut response = (upstream.status, upstream.body).into_response();
                if let Some(value) = upstream
                    .content_type
                    .as_deref()
                    .and_then(|ct| HeaderValue::from_str(ct).ok())
                {
                    response.headers_mut().insert(header::CONTENT_TYPE, value);
                }
                response
            }
        }
    }
}

/// Status code for a failed request.
pub fn error_status(error: &ProxyError) -> StatusCode {
    match error {
        ProxyError::InvalidRequest(_) | ProxyError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
        ProxyError::Transport(TransportError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
        ProxyError::Transport(_) | ProxyError::Image(_) => StatusCode::BAD_GATEWAY,
        ProxyError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = error_status(&self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
