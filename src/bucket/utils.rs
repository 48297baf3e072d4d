//! # Utility Functions (utils.rs)
//!
//! Small helpers shared by the bucket: a clock that never runs backwards and
//! a cache-line wrapper that keeps the hot counters apart.
//!
//! ```text
//!     Counter layout:
//!
//!     ┌──────────── 64/128 bytes ────────────┐
//!     │ total_accepted                       │
//!     └──────────────────────────────────────┘
//!     ┌──────────── 64/128 bytes ────────────┐
//!     │ total_rejected                       │
//!     └──────────────────────────────────────┘
//! ```

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Cache line size for x86_64 processors (Intel/AMD).
#[cfg(target_arch = "x86_64")]
pub const CACHE_LINE_SIZE: usize = 64;

/// Cache line size for ARM64 processors.
///
/// Many ARM cores prefetch in 128-byte pairs.
#[cfg(target_arch = "aarch64")]
pub const CACHE_LINE_SIZE: usize = 128;

/// Default cache line size for other architectures.
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub const CACHE_LINE_SIZE: usize = 64;

// Wall-clock epoch captured once, advanced with a monotonic Instant so
// that tick timestamps never move backwards when the system clock jumps.
static START_TIME_BASE: OnceLock<(Instant, u64)> = OnceLock::new();

/// Milliseconds since the Unix epoch, advanced monotonically.
///
/// The epoch offset is sampled the first time this is called; after that
/// only the monotonic clock is consulted, so successive calls never
/// decrease.
///
/// ```rust
/// use ramper::current_time_ms;
///
/// let a = current_time_ms();
/// let b = current_time_ms();
/// assert!(b >= a);
/// ```
#[inline]
pub fn current_time_ms() -> u64 {
    let (start, base_ms) = START_TIME_BASE.get_or_init(|| {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        (Instant::now(), epoch_ms)
    });
    base_ms.saturating_add(start.elapsed().as_millis() as u64)
}

/// Pads a value out to its own cache line to avoid false sharing.
#[cfg(target_arch = "x86_64")]
#[repr(C, align(64))]
pub(crate) struct CacheAligned<T>(pub(crate) T);

#[cfg(target_arch = "aarch64")]
#[repr(C, align(128))]
pub(crate) struct CacheAligned<T>(pub(crate) T);

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[repr(C, align(64))]
pub(crate) struct CacheAligned<T>(pub(crate) T);

impl<T> CacheAligned<T> {
    #[inline(always)]
    pub(crate) const fn new(value: T) -> Self {
        Self(value)
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for CacheAligned<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
