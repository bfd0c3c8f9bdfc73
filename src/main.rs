//! Image proxy (v1)
//!
//! Fetches remote images, caches the raw bytes on disk and serves them as
//! JPEG, cropping cover art to a 2:3 portrait centred on the largest face.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──GET /Image?url=..&type=..──▶ http (axum + tower-http)
//!                                              │
//!                                              ▼
//!                                        proxy::ImageProxy
//!                              ┌───────────────┼────────────────┐
//!                              ▼               ▼                ▼
//!                        cache::DiskCache  resilience::    imaging
//!                        (ttl, atomic      Transport       (face detect,
//!                         writes)          (3^n backoff)    crop, JPEG)
//!                                              │
//!                                              ▼
//!                                         image host
//!
//!     Cross-cutting: config (TOML), observability (tracing, metrics),
//!                    lifecycle (signals, graceful shutdown)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use image_proxy::config::{load_config, validation::validate_config, ConfigError, ProxyConfig};
use image_proxy::lifecycle::Shutdown;
use image_proxy::observability::{logging, metrics};
use image_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "image-proxy")]
#[command(about = "Caching image proxy with face-aware cover cropping", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(long)]
    bind: Option<String>,

    /// Override `cache.directory`.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Override `proxy.base_url`.
    #[arg(long)]
    base_url: Option<String>,
}

impl Args {
    fn resolve_config(&self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(dir) = &self.cache_dir {
            config.cache.directory = dir.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.proxy.base_url = base_url.clone();
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = args.resolve_config()?;

    logging::init_logging(&config.observability)?;
    tracing::info!("image-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_url = %config.proxy.base_url,
        cache_dir = %config.cache.directory.display(),
        ttl_secs = config.cache.ttl_secs,
        max_retries = config.retries.max_retries,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(config.clone())?;
    let proxy = server.proxy().clone();

    // Listener is bound last so traffic only arrives once everything is ready.
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let signal_task = shutdown.trigger_on_signal();
    let result = server.run(listener, shutdown.subscribe()).await;
    signal_task.abort();

    // Release the face model only after in-flight requests have drained.
    tracing::info!(face_detector = proxy.detector_name(), "Releasing shared resources");
    drop(proxy);

    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}
