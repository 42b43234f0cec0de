//! Process-wide storage settings.
//!
//! The page size is shared by every heap file in the process: a file is nothing but a run of
//! fixed-size pages, so two files disagreeing on it would misread each other's offsets. It is only
//! meant to be changed before any heap file is opened (in practice, by tests that want tiny pages).

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const DEFAULT_POOL_SIZE: usize = 50;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 1000;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Returns the current page size in bytes.
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Acquire)
}

/// Overrides the page size. Must not be called while heap files are open.
pub fn set_page_size(page_size: usize) {
    assert!(page_size > 0, "page size must be positive");
    PAGE_SIZE.store(page_size, Ordering::Release);
}

/// Restores [`DEFAULT_PAGE_SIZE`].
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::Release);
}

/// Configuration for the buffer pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferPoolConfig {
    /// Number of pages the pool caches at once.
    pub pool_size: usize,
    /// How long a page fetch waits for a conflicting lock before aborting its transaction.
    pub lock_timeout_ms: u64,
}

impl BufferPoolConfig {
    /// Creates a new configuration with the specified number of pages.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            ..Self::default()
        }
    }

    /// Sets the lock timeout.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

/// Sets the page size for the lifetime of the guard, restoring the default when dropped so a
/// failing test can't leak its page size into the tests that run after it.
#[cfg(test)]
pub(crate) struct PageSizeGuard;

#[cfg(test)]
impl PageSizeGuard {
    pub(crate) fn set(page_size: usize) -> Self {
        set_page_size(page_size);
        PageSizeGuard
    }
}

#[cfg(test)]
impl Drop for PageSizeGuard {
    fn drop(&mut self) {
        reset_page_size();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_page_size_override() {
        assert_eq!(page_size(), DEFAULT_PAGE_SIZE);
        set_page_size(64);
        assert_eq!(page_size(), 64);
        reset_page_size();
        assert_eq!(page_size(), DEFAULT_PAGE_SIZE);

        {
            let _guard = PageSizeGuard::set(42);
            assert_eq!(page_size(), 42);
        }
        assert_eq!(page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_buffer_pool_config() {
        let config = BufferPoolConfig::new(8).with_lock_timeout(Duration::from_millis(250));
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.lock_timeout(), Duration::from_millis(250));

        let default = BufferPoolConfig::default();
        assert_eq!(default.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(default.lock_timeout_ms, DEFAULT_LOCK_TIMEOUT_MS);
    }
}
