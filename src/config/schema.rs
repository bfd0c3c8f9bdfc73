//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the image proxy.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::MAX_KEY_LEN;

/// Root configuration for the image proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Public endpoint settings used to build and recognise local URLs.
    pub proxy: EndpointConfig,

    /// On-disk cache settings.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration for upstream fetches.
    pub retries: RetryConfig,

    /// Face detection backend settings.
    pub face_detection: FaceDetectionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Public endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL under which the proxy is reachable (e.g., "http://localhost:8080").
    pub base_url: String,

    /// Path of the image endpoint, relative to the base URL.
    pub endpoint_path: String,

    /// User-Agent sent to the upstream image host.
    pub user_agent: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            endpoint_path: "/Image".to_string(),
            user_agent: format!("image-proxy/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Disk cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Flat directory holding one blob per cache key.
    pub directory: PathBuf,

    /// Freshness window in seconds.
    pub ttl_secs: u64,

    /// Maximum accepted cache key length, at most `MAX_KEY_LEN`.
    pub max_key_len: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("cache/images"),
            ttl_secs: 24 * 60 * 60,
            max_key_len: MAX_KEY_LEN,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Timeout for a single upstream attempt in seconds.
    pub attempt_secs: u64,

    /// Inbound request timeout (total, including retries) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            attempt_secs: 30,
            request_secs: 180,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Number of retries after the first attempt.
    pub max_retries: u32,

    /// Exponent base: retry `n` waits `backoff_base^n` units.
    pub backoff_base: u32,

    /// Length of one backoff unit in milliseconds.
    pub backoff_unit_ms: u64,

    /// Ceiling for a single backoff delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: 3,
            backoff_unit_ms: 1000,
            max_delay_ms: 60_000,
        }
    }
}

/// Face detection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FaceDetectionConfig {
    /// Enable face-aware cropping. When disabled covers are right-aligned.
    pub enabled: bool,

    /// Path to the detection model file.
    pub model_path: Option<PathBuf>,

    /// Smallest face edge, in pixels, the detector will report.
    pub min_face_size: u32,
}

impl Default for FaceDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_path: None,
            min_face_size: 20,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
