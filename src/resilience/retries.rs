//! Retry logic.
//!
//! # Responsibilities
//! - Drive an `Upstream` through a bounded number of attempts
//! - Sleep with exponential backoff between transient failures
//! - Stop immediately when the caller's request is cancelled
//!
//! # Design Decisions
//! - Received responses are never retried, error statuses included
//! - Exhaustion surfaces the last underlying error, not a wrapper
//! - Cancellation is checked while an attempt is in flight and while sleeping

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::observability::metrics;
use crate::resilience::backoff::BackoffPolicy;
use crate::resilience::upstream::{Attempt, BoxError, Upstream, UpstreamResponse};

/// Failure to obtain any upstream response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Every attempt failed before a response arrived; carries the last error.
    #[error("upstream unreachable: {0}")]
    Transient(#[source] BoxError),
    /// An attempt failed in a way retrying cannot fix.
    #[error("upstream request failed: {0}")]
    Terminal(#[source] BoxError),
    /// The caller gave up.
    #[error("request cancelled")]
    Cancelled,
}

/// Upstream fetcher with retries.
#[derive(Clone)]
pub struct Transport {
    upstream: Arc<dyn Upstream>,
    policy: BackoffPolicy,
}

impl Transport {
    pub fn new(upstream: Arc<dyn Upstream>, policy: BackoffPolicy) -> Self {
        Self { upstream, policy }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Fetch `url`, retrying transient failures.
    pub async fn fetch(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<UpstreamResponse, TransportError> {
        let mut retry = 0;

        loop {
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                attempt = self.upstream.get(url) => attempt,
            };

            let error = match attempt {
                Attempt::Response(response) => {
                    metrics::record_upstream_attempt("response");
                    return Ok(response);
                }
                Attempt::Terminal(e) => {
                    metrics::record_upstream_attempt("terminal");
                    tracing::warn!(url = %url, attempt = retry + 1, error = %e, "Upstream request failed");
                    return Err(TransportError::Terminal(e));
                }
                Attempt::Transient(e) => {
                    metrics::record_upstream_attempt("transient");
                    e
                }
            };

            if retry >= self.policy.max_retries {
                tracing::error!(url = %url, attempts = retry + 1, error = %error, "Upstream retries exhausted");
                return Err(TransportError::Transient(error));
            }

            retry += 1;
            let delay = self.policy.delay_for(retry);
            tracing::info!(url = %url, retry, delay = ?delay, error = %error, "Retrying after network error");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use bytes::Bytes;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Replays scripted outcomes and records when each attempt happened.
    struct Scripted {
        script: Mutex<Vec<Attempt>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl Scripted {
        fn new(mut script: Vec<Attempt>) -> Arc<Self> {
            script.reverse();
            Arc::new(Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Upstream for Scripted {
        async fn get(&self, _url: &Url) -> Attempt {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(Instant::now());
                calls.len()
            };
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Attempt::Transient(format!("refused #{n}").into()))
        }
    }

    fn ok(status: StatusCode) -> Attempt {
        Attempt::Response(UpstreamResponse {
            status,
            content_type: Some("image/jpeg".into()),
            body: Bytes::from_static(b"img"),
        })
    }

    fn url() -> Url {
        Url::parse("https://images.example.com/a.jpg").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_timing_and_last_error() {
        let upstream = Scripted::new(Vec::new());
        let transport = Transport::new(upstream.clone(), BackoffPolicy::default());

        let start = Instant::now();
        let err = transport
            .fetch(&url(), &CancellationToken::new())
            .await
            .unwrap_err();

        let calls = upstream.call_times();
        assert_eq!(calls.len(), 4);
        let gaps: Vec<_> = calls.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![Duration::from_secs(3), Duration::from_secs(9), Duration::from_secs(27)]
        );
        assert_eq!(start.elapsed(), Duration::from_secs(39));

        match err {
            TransportError::Transient(e) => assert_eq!(e.to_string(), "refused #4"),
            other => panic!("expected transient error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let upstream = Scripted::new(vec![
            Attempt::Transient("dns".into()),
            ok(StatusCode::OK),
        ]);
        let transport = Transport::new(upstream.clone(), BackoffPolicy::default());

        let response = transport.fetch(&url(), &CancellationToken::new()).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(upstream.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_is_not_retried() {
        let upstream = Scripted::new(vec![ok(StatusCode::SERVICE_UNAVAILABLE)]);
        let transport = Transport::new(upstream.clone(), BackoffPolicy::default());

        let response = transport.fetch(&url(), &CancellationToken::new()).await.unwrap();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(upstream.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_is_not_retried() {
        let upstream = Scripted::new(vec![Attempt::Terminal("bad url".into())]);
        let transport = Transport::new(upstream.clone(), BackoffPolicy::default());

        let err = transport.fetch(&url(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, TransportError::Terminal(_)));
        assert_eq!(upstream.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_retrying() {
        let upstream = Scripted::new(Vec::new());
        let transport = Transport::new(upstream.clone(), BackoffPolicy::default());
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let err = transport.fetch(&url(), &cancel).await.unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
        // First attempt at t=0, second at t=3, cancelled during the 9s sleep.
        assert_eq!(upstream.call_times().len(), 2);
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_attempt() {
        let upstream = Scripted::new(vec![ok(StatusCode::OK)]);
        let transport = Transport::new(upstream.clone(), BackoffPolicy::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = transport.fetch(&url(), &cancel).await.unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
        assert!(upstream.call_times().is_empty());
    }
}
