//! Image cache subsystem.
//!
//! # Data Flow
//! ```text
//! source URL
//!     → key.rs (form-urlencode, length and traversal checks)
//!     → disk.rs (flat directory, mtime freshness, temp-file + rename writes)
//! ```
//!
//! # Design Decisions
//! - The cache stores raw upstream bytes; cropping happens on every serve
//! - Freshness is judged from filesystem mtime against an injected clock
//! - Unsafe keys and I/O errors degrade to a miss, never to a failed request
//! - No eviction: stale entries are overwritten on the next fetch

pub mod disk;
pub mod key;

use std::time::SystemTime;

pub use disk::{CacheError, DiskCache};
pub use key::{CacheKey, CacheKeyError, MAX_FILE_NAME_LEN, MAX_KEY_LEN};

/// Source of "now" for freshness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}
