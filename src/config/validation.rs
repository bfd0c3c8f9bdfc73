//! Configuration validation.
//!
//! Serde handles syntax; this module checks values that parse but cannot work
//! (unparseable base URL, zero timeouts, degenerate backoff). All problems are
//! collected so a bad file is reported in one pass.

use thiserror::Error;
use url::Url;

use crate::cache::MAX_KEY_LEN;
use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.proxy.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "proxy.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("proxy.base_url", e.to_string())),
    }

    if !config.proxy.endpoint_path.starts_with('/') || config.proxy.endpoint_path.len() < 2 {
        errors.push(ValidationError::new(
            "proxy.endpoint_path",
            "must be an absolute path such as /Image",
        ));
    }

    if config.cache.directory.as_os_str().is_empty() {
        errors.push(ValidationError::new("cache.directory", "must not be empty"));
    }
    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::new("cache.ttl_secs", "must be greater than 0"));
    }
    if config.cache.max_key_len == 0 || config.cache.max_key_len > MAX_KEY_LEN {
        errors.push(ValidationError::new(
            "cache.max_key_len",
            format!("must be between 1 and {MAX_KEY_LEN}"),
        ));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.attempt_secs == 0 {
        errors.push(ValidationError::new("timeouts.attempt_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.retries.backoff_base == 0 {
        errors.push(ValidationError::new("retries.backoff_base", "must be at least 1"));
    }

    if config.face_detection.min_face_size == 0 {
        errors.push(ValidationError::new(
            "face_detection.min_face_size",
            "must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ProxyConfig::default();
        config.proxy.base_url = "ftp://example.com".into();
        config.timeouts.attempt_secs = 0;
        config.retries.backoff_base = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["proxy.base_url", "timeouts.attempt_secs", "retries.backoff_base"]
        );
    }

    #[test]
    fn test_max_key_len_cannot_exceed_default_limit() {
        let mut config = ProxyConfig::default();
        config.cache.max_key_len = 4096;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "cache.max_key_len");

        config.cache.max_key_len = 128;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_relative_endpoint_path() {
        let mut config = ProxyConfig::default();
        config.proxy.endpoint_path = "Image".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "proxy.endpoint_path");
    }
}
