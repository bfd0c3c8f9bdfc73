//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Fetch from image host:
//!     → upstream.rs (one GET with connect/attempt timeouts, classified outcome)
//!     → On transient failure: retries.rs (sleep per backoff.rs, try again)
//!     → Response of any status, or the last error once attempts run out
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream attempt has a deadline
//! - Only failures that happen before a response are retried
//! - Backoff is deliberately steep for a slow, rate-limited image host
//! - Every wait is cancellable by the inbound request

pub mod backoff;
pub mod retries;
pub mod upstream;

pub use backoff::BackoffPolicy;
pub use retries::{Transport, TransportError};
pub use upstream::{Attempt, BoxError, HttpUpstream, Upstream, UpstreamResponse};
