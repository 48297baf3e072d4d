//! # Adaptive Bucket Module
//!
//! Internal implementation of the adaptive token bucket, split by concern.
//!
//! ## Module Structure
//!
//! ```text
//!     bucket/
//!     ├── mod.rs          (You are here - Module organization)
//!     ├── config.rs       (Configuration and policy constants)
//!     ├── error.rs        (Construction errors)
//!     ├── state.rs        (Ramp & refill state machine)
//!     ├── core.rs         (Thread-safe bucket and refill thread)
//!     ├── metrics.rs      (Snapshots and capacity gauge)
//!     └── utils.rs        (Clock and cache alignment)
//! ```
//!
//! ## Architecture Flow
//!
//! ```text
//!     accept() / refill thread
//!          │
//!          ▼
//!     ┌─────────┐
//!     │  Core   │ ◄── Locking, lifecycle, counters
//!     └────┬────┘
//!          │
//!          ▼
//!     ┌─────────┐
//!     │  State  │ ◄── Ramp decision & token arithmetic
//!     └────┬────┘
//!          │
//!          ▼
//!     ┌─────────┐
//!     │ Config  │ ◄── Settings & validation
//!     └─────────┘
//! ```

mod config;
mod core;
mod error;
mod metrics;
mod state;
mod utils;

/// Configuration and the fixed thresholds of the ramp policy
pub use config::{
    BucketConfig, DEFAULT_TICK_INTERVAL_MS, INITIAL_CAPACITY_FRACTION, MAX_TICK_INTERVAL_MS,
    SCALE_DOWN_THRESHOLD, SCALE_UP_THRESHOLD,
};

/// The adaptive bucket itself
pub use self::core::AdaptiveTokenBucket;

/// Construction failures
pub use error::ConfigurationError;

/// Observability for the bucket
pub use metrics::{BucketMetrics, CapacityGauge, HealthStatus};

/// Per-tick results
pub use state::{RampDirection, TickOutcome};

/// Clock and platform helpers
pub use utils::{current_time_ms, CACHE_LINE_SIZE};
