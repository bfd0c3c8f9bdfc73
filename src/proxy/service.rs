//! Image proxy orchestration.
//!
//! # Request Flow
//! ```text
//! (url, role)
//!     → validate (blank URL rejected before any I/O)
//!     → unwrap proxy-local wrapper URLs
//!     → cache hit?  → transform → JPEG
//!     → fetch with retries
//!         non-2xx        → forwarded verbatim
//!     → persist raw bytes
//!         unsafe key     → not cached, still transformed
//!         I/O failure    → raw upstream response, untransformed
//!     → transform → JPEG
//! ```

use std::sync::Arc;

use axum::http::StatusCode;
use bytes::Bytes;
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cache::{CacheError, CacheKey, DiskCache};
use crate::config::ProxyConfig;
use crate::imaging::{transform, FaceDetector, ImageError, ImageRole};
use crate::observability::metrics;
use crate::proxy::local_url::LocalUrls;
use crate::resilience::{BackoffPolicy, HttpUpstream, Transport, TransportError, UpstreamResponse};

/// Content type of every transformed image.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// What the proxy hands back for a request.
#[derive(Debug, Clone)]
pub enum ImageResponse {
    /// Re-encoded JPEG.
    Image(Bytes),
    /// Upstream response relayed as received: an error status, or the raw
    /// image when it could not be cached.
    Passthrough(UpstreamResponse),
}

impl ImageResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            ImageResponse::Image(_) => StatusCode::OK,
            ImageResponse::Passthrough(upstream) => upstream.status,
        }
    }
}

/// Errors that fail a request outright.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid source URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("image worker failed: {0}")]
    Worker(#[from] JoinError),
}

/// Failure to assemble an `ImageProxy` from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The image proxy core. Cheap to share behind an `Arc`.
pub struct ImageProxy {
    cache: DiskCache,
    transport: Transport,
    detector: Arc<dyn FaceDetector>,
    local: LocalUrls,
}

impl ImageProxy {
    pub fn new(
        cache: DiskCache,
        transport: Transport,
        detector: Arc<dyn FaceDetector>,
        local: LocalUrls,
    ) -> Self {
        Self {
            cache,
            transport,
            detector,
            local,
        }
    }

    /// Wire the real upstream client and disk cache from configuration.
    pub fn from_config(
        config: &ProxyConfig,
        detector: Arc<dyn FaceDetector>,
    ) -> Result<Self, SetupError> {
        let upstream = HttpUpstream::new(&config.timeouts, &config.proxy)?;
        let transport = Transport::new(Arc::new(upstream), BackoffPolicy::from(&config.retries));
        let local = LocalUrls::new(&config.proxy.base_url, &config.proxy.endpoint_path)?;
        Ok(Self::new(
            DiskCache::from_config(&config.cache),
            transport,
            detector,
            local,
        ))
    }

    pub fn local_urls(&self) -> &LocalUrls {
        &self.local
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Serve `url` in the given role.
    pub async fn get_image(
        &self,
        url: &str,
        role: ImageRole,
        cancel: &CancellationToken,
    ) -> Result<ImageResponse, ProxyError> {
        if url.trim().is_empty() {
            return Err(ProxyError::InvalidRequest("url can not be empty".into()));
        }

        let (source, role) = self.local.unwrap(url, role);
        let target = parse_source(&source)?;
        tracing::info!(url = %source, role = %role, "Get image");

        let key = CacheKey::for_url(&source);
        if let Some(bytes) = self.cache.try_read(&key).await {
            return self.render(Bytes::from(bytes), role).await;
        }

        let upstream = self.transport.fetch(&target, cancel).await?;
        if !upstream.is_success() {
            tracing::warn!(url = %source, status = %upstream.status, "Upstream returned an error status");
            return Ok(ImageResponse::Passthrough(upstream));
        }

        match self.cache.write(&key, &upstream.body).await {
            Ok(()) => metrics::record_cache_write("ok"),
            Err(CacheError::Key(e)) => {
                metrics::record_cache_write("skipped");
                tracing::warn!(url = %source, error = %e, "Image not cacheable; serving without cache");
            }
            Err(e) => {
                metrics::record_cache_write("error");
                tracing::error!(url = %source, error = %e, "Save image cache error");
                return Ok(ImageResponse::Passthrough(upstream));
            }
        }

        self.render(upstream.body, role).await
    }

    async fn render(&self, bytes: Bytes, role: ImageRole) -> Result<ImageResponse, ProxyError> {
        let detector = Arc::clone(&self.detector);
        let transformed =
            tokio::task::spawn_blocking(move || transform(&bytes, role, detector.as_ref()))
                .await??;

        metrics::record_transform(role.as_str(), transformed.crop.is_some());
        Ok(ImageResponse::Image(Bytes::from(transformed.jpeg)))
    }
}

fn parse_source(source: &str) -> Result<Url, ProxyError> {
    let invalid = |reason: String| ProxyError::InvalidUrl {
        url: source.to_string(),
        reason,
    };
    let url = Url::parse(source.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}
