//! Single-attempt upstream access.
//!
//! # Responsibilities
//! - Perform exactly one GET against the image host
//! - Classify the outcome so the retry loop never inspects raw errors
//! - Enforce connect and per-attempt timeouts
//!
//! # Design Decisions
//! - A received response is always `Attempt::Response`, whatever its status
//! - Connect, timeout and send failures are transient; everything else is terminal

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use url::Url;

use crate::config::{EndpointConfig, TimeoutConfig};

/// Boxed error carried through transport results.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A fully received upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt {
    /// A response arrived; the caller decides what its status means.
    Response(UpstreamResponse),
    /// Failed before a response was received. Worth retrying.
    Transient(BoxError),
    /// Failed in a way another attempt cannot fix.
    Terminal(BoxError),
}

/// Something that can perform one upstream GET.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get(&self, url: &Url) -> Attempt;
}

/// `reqwest`-backed upstream.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(timeouts: &TimeoutConfig, endpoint: &EndpointConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.attempt_secs))
            .user_agent(endpoint.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get(&self, url: &Url) -> Attempt {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return classify(e),
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match response.bytes().await {
            Ok(body) => Attempt::Response(UpstreamResponse {
                status,
                content_type,
                body,
            }),
            // The status line arrived, so a timeout while streaming the body
            // is still a transport failure rather than an HTTP answer.
            Err(e) if e.is_timeout() => Attempt::Transient(Box::new(e)),
            Err(e) => Attempt::Terminal(Box::new(e)),
        }
    }
}

fn classify(e: reqwest::Error) -> Attempt {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        Attempt::Transient(Box::new(e))
    } else {
        Attempt::Terminal(Box::new(e))
    }
}
