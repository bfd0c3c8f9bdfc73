//! Image proxy core.
//!
//! Ties the cache, transport and imaging subsystems together behind
//! [`ImageProxy::get_image`]. Everything it needs is injected, so tests can
//! swap in a fake upstream, a temporary cache directory and a scripted
//! face detector.

pub mod local_url;
pub mod service;

pub use local_url::LocalUrls;
pub use service::{ImageProxy, ImageResponse, ProxyError, SetupError, JPEG_CONTENT_TYPE};
