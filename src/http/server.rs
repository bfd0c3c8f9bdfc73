//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the image and health handlers
//! - Wire up middleware (tracing, request timeout, request ID)
//! - Bind server to listener and drain on shutdown
//! - Give each request a cancellation token tied to its lifetime

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{request_id, ImageQuery, MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::response::error_status;
use crate::imaging::{build_detector, FaceDetector};
use crate::observability::metrics;
use crate::proxy::{ImageProxy, SetupError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ImageProxy>,
}

/// HTTP server for the image proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    proxy: Arc<ImageProxy>,
}

impl HttpServer {
    /// Create a server with the real upstream client and the configured
    /// face detector.
    pub fn new(config: ProxyConfig) -> Result<Self, SetupError> {
        let detector = build_detector(&config.face_detection);
        Self::with_detector(config, detector)
    }

    /// Create a server with an explicit face detection backend.
    pub fn with_detector(
        config: ProxyConfig,
        detector: Arc<dyn FaceDetector>,
    ) -> Result<Self, SetupError> {
        let proxy = Arc::new(ImageProxy::from_config(&config, detector)?);
        Ok(Self::with_proxy(config, proxy))
    }

    /// Create a server around an already assembled proxy core.
    pub fn with_proxy(config: ProxyConfig, proxy: Arc<ImageProxy>) -> Self {
        let state = AppState {
            proxy: Arc::clone(&proxy),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            proxy,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let endpoint = state.proxy.local_urls().endpoint_path().to_string();
        let mut router = Router::new()
            .route(&endpoint, get(image_handler))
            .route("/health", get(health_handler));

        // Also answer on the bare endpoint when the base URL carries a prefix
        // that a fronting reverse proxy strips.
        if endpoint != config.proxy.endpoint_path {
            router = router.route(&config.proxy.endpoint_path, get(image_handler));
        }

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
        )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoint = %self.proxy.local_urls().endpoint_path(),
            face_detector = self.proxy.detector_name(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn proxy(&self) -> &Arc<ImageProxy> {
        &self.proxy
    }
}

/// `GET <endpoint>?url=..&type=..`
async fn image_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ImageQuery>,
) -> Response {
    let start = Instant::now();
    let role = query.role();
    let url = query.url.unwrap_or_default();

    // Dropping the guard (client gone, request timed out) cancels the fetch.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let (status, response) = match state.proxy.get_image(&url, role, &cancel).await {
        Ok(image) => (image.status(), image.into_response()),
        Err(e) => {
            let status = error_status(&e);
            if status.is_server_error() {
                tracing::error!(
                    request_id = request_id(&headers),
                    url = %url,
                    role = %role,
                    error = %e,
                    "Image request failed"
                );
            } else {
                tracing::warn!(
                    request_id = request_id(&headers),
                    url = %url,
                    role = %role,
                    error = %e,
                    "Rejected image request"
                );
            }
            (status, e.into_response())
        }
    };

    metrics::record_request(role.as_str(), status.as_u16(), start);
    response
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "face_detector": state.proxy.detector_name(),
        })),
    )
}
