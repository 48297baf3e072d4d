//! # Ramper - Adaptive Token-Bucket Admission Control
//!
//! A token bucket that decides, for every unit of work, whether to admit or
//! reject it, and that moves its own throughput ceiling with demand. A cold
//! bucket starts at a tenth of its configured maximum and climbs toward it
//! while callers keep draining it; once demand drops off the ceiling comes
//! back down.
//!
//! ## How It Works
//!
//! ```text
//!     Capacity per tick while callers drain the bucket
//!     (max 100/min, 1 minute ramp, ramp_step 16):
//!
//!     100 ┤                              ●
//!      90 ┤                         ●
//!      74 ┤                    ●
//!      58 ┤               ●
//!      42 ┤          ●
//!      26 ┤     ●
//!      10 ┤●
//!         └┬────┬────┬────┬────┬────┬────►
//!          0   10s  20s  30s  40s  50s  60s
//! ```
//!
//! - **Tokens** = permission to admit one request
//! - **Capacity** = how many tokens the bucket may hold, per minute
//! - **Tick** = every 10 seconds: adjust capacity, then top up tokens
//!
//! On each tick the bucket looks at how many tokens were left over:
//!
//! | Leftover / capacity | Meaning            | Capacity change   |
//! |---------------------|--------------------|-------------------|
//! | below 40%           | callers drain it   | `+ ramp_step`     |
//! | 40% to 90%          | about right        | none              |
//! | above 90%           | demand is light    | `- ramp_step`     |
//!
//! `ramp_step` is sized so that a bucket drained on every tick reaches its
//! maximum within the configured ramp period.
//!
//! ## Quick Start
//!
//! ```rust
//! use ramper::AdaptiveTokenBucket;
//!
//! // Up to 600 requests/minute, ramped in over 5 minutes
//! let bucket = AdaptiveTokenBucket::new(600, 5).unwrap();
//! bucket.start().unwrap();
//!
//! if bucket.accept() {
//!     // Handle the request
//! } else {
//!     // Return 429 Too Many Requests
//! }
//!
//! bucket.stop();
//! ```
//!
//! ### Builder and capacity gauge
//!
//! ```rust
//! use prometheus::IntGauge;
//! use ramper::AdaptiveBucketBuilder;
//!
//! let gauge = IntGauge::new("admission_capacity", "Current admission capacity").unwrap();
//! let bucket = AdaptiveBucketBuilder::new()
//!     .max_capacity(30_000)
//!     .ramp_period_minutes(10)
//!     .capacity_gauge(gauge.clone())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(gauge.get(), 3_000);
//! ```
//!
//! ## Thread Safety
//!
//! [`AdaptiveTokenBucket`] is `Send + Sync`; share it through an `Arc`
//! ([`SharedBucket`]). Admission checks and refill ticks serialize on one
//! short-lived mutex, so every token is handed to exactly one caller.
//!
//! ## Logging
//!
//! The crate logs through [`tracing`]: `info` when the refill thread starts
//! and stops, `debug` for every tick, `trace` for every admission decision.
//! Install a subscriber in the application to see them.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

// Internal module
mod bucket;

// Public re-exports
pub use bucket::{
    current_time_ms, AdaptiveTokenBucket, BucketConfig, BucketMetrics, CapacityGauge,
    ConfigurationError, HealthStatus, RampDirection, TickOutcome, CACHE_LINE_SIZE,
    DEFAULT_TICK_INTERVAL_MS, INITIAL_CAPACITY_FRACTION, MAX_TICK_INTERVAL_MS,
    SCALE_DOWN_THRESHOLD, SCALE_UP_THRESHOLD,
};

use std::sync::Arc;

/// An adaptive bucket wrapped in `Arc` for sharing across threads.
///
/// # Example
/// ```rust
/// use ramper::{AdaptiveTokenBucket, SharedBucket};
/// use std::sync::Arc;
///
/// let shared: SharedBucket = Arc::new(AdaptiveTokenBucket::new(100, 0).unwrap());
///
/// let handle = {
///     let bucket = shared.clone();
///     std::thread::spawn(move || bucket.accept())
/// };
/// assert!(handle.join().unwrap());
/// ```
pub type SharedBucket = Arc<AdaptiveTokenBucket>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum supported Rust version.
pub const MSRV: &str = "1.70.0";

/// Prelude module for convenient imports.
///
/// ```rust
/// use ramper::prelude::*;
/// ```
pub mod prelude {
    //! Common imports for typical admission-control use.
    //!
    //! # Example
    //! ```rust
    //! use ramper::prelude::*;
    //!
    //! let bucket = AdaptiveTokenBucket::new(100, 1).unwrap();
    //! let config = BucketConfig::default();
    //! let status = HealthStatus::Healthy;
    //! ```

    pub use crate::{
        AdaptiveBucketBuilder, AdaptiveTokenBucket, BucketConfig, BucketMetrics, CapacityGauge,
        ConfigurationError, HealthStatus, RampDirection, SharedBucket, TickOutcome,
    };
}

/// Builder for adaptive buckets.
///
/// Starts from [`BucketConfig::default`] and is validated on
/// [`build`](Self::build).
///
/// # Example
///
/// ```rust
/// use ramper::{AdaptiveBucketBuilder, ConfigurationError};
///
/// let bucket = AdaptiveBucketBuilder::new()
///     .max_capacity(1_200)
///     .ramp_period_minutes(2)
///     .tick_interval_ms(5_000)
///     .build()
///     .unwrap();
///
/// assert_eq!(bucket.current_capacity(), 120);
/// assert_eq!(bucket.ticks_per_minute(), 12);
/// assert_eq!(bucket.ramp_step(), 50);
///
/// let err = AdaptiveBucketBuilder::new().max_capacity(0).build().unwrap_err();
/// assert_eq!(err, ConfigurationError::MaxCapacity(0));
/// ```
#[derive(Clone, Default)]
pub struct AdaptiveBucketBuilder {
    config: BucketConfig,
    gauge: Option<Arc<dyn CapacityGauge>>,
}

impl AdaptiveBucketBuilder {
    /// Creates a builder with default configuration.
    ///
    /// Default configuration:
    /// - 600 tokens/min ceiling
    /// - 5 minute ramp
    /// - 10 second tick interval
    /// - no capacity gauge
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn from_config(config: BucketConfig) -> Self {
        Self {
            config,
            gauge: None,
        }
    }

    /// Sets the capacity ceiling in tokens per minute (must be at least 1).
    pub fn max_capacity(mut self, max_capacity: i64) -> Self {
        self.config.max_capacity = max_capacity;
        self
    }

    /// Sets the ramp period in minutes (0 disables ramping).
    pub fn ramp_period_minutes(mut self, minutes: i64) -> Self {
        self.config.ramp_period_minutes = minutes;
        self
    }

    /// Sets the refill tick interval in milliseconds (1 to 60000).
    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.tick_interval_ms = ms;
        self
    }

    /// Publishes the current capacity to `gauge` at construction and after
    /// every tick.
    pub fn capacity_gauge<G>(mut self, gauge: G) -> Self
    where
        G: CapacityGauge + 'static,
    {
        self.gauge = Some(Arc::new(gauge));
        self
    }

    /// Validates the configuration and builds the bucket.
    ///
    /// The refill thread is not started; call
    /// [`AdaptiveTokenBucket::start`] when ready.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn build(self) -> Result<AdaptiveTokenBucket, ConfigurationError> {
        AdaptiveTokenBucket::from_parts(self.config, self.gauge)
    }
}

impl std::fmt::Debug for AdaptiveBucketBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveBucketBuilder")
            .field("config", &self.config)
            .field("has_gauge", &self.gauge.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_basic_functionality() {
        let bucket = AdaptiveTokenBucket::new(100, 0).unwrap();

        for _ in 0..100 {
            assert!(bucket.accept());
        }
        assert!(!bucket.accept());

        let metrics = bucket.metrics();
        assert_eq!(metrics.total_accepted, 100);
        assert_eq!(metrics.total_rejected, 1);
    }

    #[test]
    fn test_builder() {
        let bucket = AdaptiveBucketBuilder::new()
            .max_capacity(50)
            .ramp_period_minutes(0)
            .tick_interval_ms(1_000)
            .build()
            .unwrap();

        assert_eq!(bucket.available_tokens(), 50);
        assert_eq!(bucket.ticks_per_minute(), 60);
    }

    #[test]
    fn test_builder_validation() {
        assert_eq!(
            AdaptiveBucketBuilder::new().max_capacity(-1).build().unwrap_err(),
            ConfigurationError::MaxCapacity(-1)
        );
        assert_eq!(
            AdaptiveBucketBuilder::new().ramp_period_minutes(-1).build().unwrap_err(),
            ConfigurationError::RampPeriod(-1)
        );
        assert_eq!(
            AdaptiveBucketBuilder::new().tick_interval_ms(0).build().unwrap_err(),
            ConfigurationError::TickInterval(0)
        );
    }

    #[test]
    fn test_builder_default() {
        let bucket = AdaptiveBucketBuilder::default().build().unwrap();
        assert_eq!(bucket.max_capacity(), 600);
        assert_eq!(bucket.current_capacity(), 60);
        assert_eq!(bucket.ramp_step(), 20);
    }

    #[test]
    fn test_builder_from_config() {
        let config = BucketConfig::new(900, 3);
        let bucket = AdaptiveBucketBuilder::from_config(config.clone()).build().unwrap();
        assert_eq!(bucket.config(), &config);
    }

    #[test]
    fn test_builder_gauge() {
        let gauge = prometheus::IntGauge::new("capacity", "capacity").unwrap();
        let builder = AdaptiveBucketBuilder::new()
            .max_capacity(100)
            .ramp_period_minutes(1)
            .capacity_gauge(gauge.clone());
        assert!(format!("{:?}", builder).contains("has_gauge: true"));

        let bucket = builder.build().unwrap();
        assert_eq!(gauge.get(), 10);

        bucket.tick();
        assert_eq!(gauge.get(), 1);
    }

    #[test]
    fn test_thread_safety() {
        let bucket: SharedBucket = Arc::new(AdaptiveTokenBucket::new(1_000, 0).unwrap());
        let mut handles = vec![];

        for _ in 0..10 {
            let bucket = bucket.clone();
            handles.push(thread::spawn(move || {
                let mut accepted = 0;
                for _ in 0..200 {
                    if bucket.accept() {
                        accepted += 1;
                    }
                }
                accepted
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 1_000);
    }

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let _bucket = AdaptiveTokenBucket::new(10, 1).unwrap();
        let _config = BucketConfig::default();
        let _builder = AdaptiveBucketBuilder::new();
        let _status = HealthStatus::Healthy;
        let _direction = RampDirection::Hold;
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(MSRV, "1.70.0");
        assert_eq!(DEFAULT_TICK_INTERVAL_MS, 10_000);
        assert!(SCALE_UP_THRESHOLD < SCALE_DOWN_THRESHOLD);
        assert_eq!(INITIAL_CAPACITY_FRACTION, 0.10);
    }
}
