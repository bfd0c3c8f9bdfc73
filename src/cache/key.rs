//! Cache key derivation and safety checks.
//!
//! Keys are the form-urlencoded source URL, so they are reversible and never
//! contain a path separator. The checks below still run because the input is
//! caller-controlled and the encoding alone does not rule out `..`.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use url::form_urlencoded;

/// Default upper bound on key length.
pub const MAX_KEY_LEN: usize = 256;

/// Longest file name ext4, xfs and tmpfs accept, in bytes. Keys are ASCII.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Reasons a key may not touch the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheKeyError {
    #[error("cache key is {len} characters, limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("cache key escapes the cache directory")]
    Traversal,
}

/// Cache key for one source URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for an (already unwrapped) source URL.
    pub fn for_url(url: &str) -> Self {
        Self(form_urlencoded::byte_serialize(url.as_bytes()).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Recover the source URL this key was derived from.
    pub fn original_url(&self) -> String {
        form_urlencoded::parse(format!("k={}", self.0).as_bytes())
            .next()
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    }

    /// Join the key onto `dir`, refusing anything that is not a direct child.
    ///
    /// The length limit is `max_len` or the file name limit, whichever is lower.
    pub fn resolve(&self, dir: &Path, max_len: usize) -> Result<PathBuf, CacheKeyError> {
        let max = max_len.min(MAX_FILE_NAME_LEN);
        if self.0.len() > max {
            return Err(CacheKeyError::TooLong {
                len: self.0.len(),
                max,
            });
        }

        let mut components = Path::new(&self.0).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(CacheKeyError::Traversal),
        }

        let path = dir.join(&self.0);
        if path.parent() != Some(dir) {
            return Err(CacheKeyError::Traversal);
        }
        Ok(path)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
