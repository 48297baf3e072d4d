//! # Bucket Configuration
//!
//! Settings for an adaptive token bucket and the fixed policy constants that
//! shape its control loop.
//!
//! ```text
//!     Adaptive Bucket Configuration:
//!
//!     ┌──────────────────────────────────────┐
//!     │ max_capacity: 600      ← ceiling     │
//!     │ ramp_period_minutes: 5 ← climb time  │
//!     │ tick_interval_ms: 10000 ← cadence    │
//!     │                                      │
//!     │ Cold start at 60 tokens/min (10%),   │
//!     │ climbing 2 per tick under pressure   │
//!     └──────────────────────────────────────┘
//! ```
//!
//! Capacity is expressed in tokens per minute. The tick interval sets how
//! often the refill thread runs, and therefore how many ticks make up one
//! minute of ramping.

use super::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Default refill cadence: one tick every 10 seconds, six per minute.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 10_000;

/// Longest allowed tick interval. At least one tick must fit in a minute.
pub const MAX_TICK_INTERVAL_MS: u64 = 60_000;

/// Utilization below which the bucket grows its capacity.
///
/// Few tokens left over at tick time means callers are draining the bucket.
pub const SCALE_UP_THRESHOLD: f64 = 0.40;

/// Utilization above which the bucket shrinks its capacity.
///
/// Most tokens left over at tick time means demand is well under the ceiling.
pub const SCALE_DOWN_THRESHOLD: f64 = 0.90;

/// Fraction of `max_capacity` a ramping bucket starts at.
pub const INITIAL_CAPACITY_FRACTION: f64 = 0.10;

// Integer forms of the thresholds above. Comparisons are done in exact
// arithmetic so that a ratio of exactly 0.40 or 0.90 stays inside the band.
pub(crate) const SCALE_UP_PERCENT: u128 = 40;
pub(crate) const SCALE_DOWN_PERCENT: u128 = 90;
pub(crate) const INITIAL_CAPACITY_DIVISOR: u64 = 10;

const ENV_MAX_CAPACITY: &str = "RAMPER_MAX_CAPACITY";
const ENV_RAMP_PERIOD_MINUTES: &str = "RAMPER_RAMP_PERIOD_MINUTES";
const ENV_TICK_INTERVAL_MS: &str = "RAMPER_TICK_INTERVAL_MS";

/// Configuration for an [`AdaptiveTokenBucket`](crate::AdaptiveTokenBucket).
///
/// Signed integers are used for the caller-supplied limits so that a negative
/// value coming from a config file or flag is reported as a
/// [`ConfigurationError`] instead of wrapping around.
///
/// ## Examples
///
/// ```rust
/// use ramper::BucketConfig;
///
/// // Ramp from 10% to 1200 tokens/min over 10 minutes
/// let config = BucketConfig::new(1200, 10);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.ticks_per_minute(), 6);
///
/// // Full capacity immediately
/// let config = BucketConfig::without_ramp(300);
/// assert_eq!(config.ramp_period_minutes, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    /// Ceiling the capacity may grow to, in tokens per minute.
    pub max_capacity: i64,

    /// Minutes needed to climb from the initial to the maximum capacity
    /// under sustained demand. Zero disables ramping.
    pub ramp_period_minutes: i64,

    /// Milliseconds between refill ticks.
    pub tick_interval_ms: u64,
}

impl Default for BucketConfig {
    /// 600 tokens/min, ramped over 5 minutes, ticking every 10 seconds.
    fn default() -> Self {
        Self {
            max_capacity: 600,
            ramp_period_minutes: 5,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl BucketConfig {
    /// Creates a configuration with the default tick interval.
    pub fn new(max_capacity: i64, ramp_period_minutes: i64) -> Self {
        Self {
            max_capacity,
            ramp_period_minutes,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }

    /// Creates a configuration that starts at `max_capacity` and never ramps.
    pub fn without_ramp(max_capacity: i64) -> Self {
        Self::new(max_capacity, 0)
    }

    /// Sets the refill tick interval.
    ///
    /// Shorter intervals mean more ticks per minute, so the ramp step and the
    /// per-tick refill shrink accordingly.
    ///
    /// ```rust
    /// use ramper::BucketConfig;
    ///
    /// let config = BucketConfig::new(100, 1).with_tick_interval_ms(1_000);
    /// assert_eq!(config.ticks_per_minute(), 60);
    /// ```
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Loads a configuration from the environment, starting from defaults.
    ///
    /// Reads `RAMPER_MAX_CAPACITY`, `RAMPER_RAMP_PERIOD_MINUTES` and
    /// `RAMPER_TICK_INTERVAL_MS`. Values that fail to parse are logged and
    /// ignored. Range checks are left to [`validate`](Self::validate).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, ENV_MAX_CAPACITY) {
            config.max_capacity = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_RAMP_PERIOD_MINUTES) {
            config.ramp_period_minutes = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_TICK_INTERVAL_MS) {
            config.tick_interval_ms = v;
        }

        config
    }

    /// Checks every parameter, reporting the first one out of range.
    ///
    /// ```rust
    /// use ramper::{BucketConfig, ConfigurationError};
    ///
    /// assert_eq!(
    ///     BucketConfig::new(100, -1).validate(),
    ///     Err(ConfigurationError::RampPeriod(-1))
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_capacity < 1 {
            return Err(ConfigurationError::MaxCapacity(self.max_capacity));
        }
        if self.ramp_period_minutes < 0 {
            return Err(ConfigurationError::RampPeriod(self.ramp_period_minutes));
        }
        if self.tick_interval_ms == 0 || self.tick_interval_ms > MAX_TICK_INTERVAL_MS {
            return Err(ConfigurationError::TickInterval(self.tick_interval_ms));
        }
        Ok(())
    }

    /// Number of refill ticks in one minute.
    ///
    /// Returns 0 for an out-of-range interval; such a config fails
    /// [`validate`](Self::validate).
    pub fn ticks_per_minute(&self) -> u64 {
        if self.tick_interval_ms == 0 {
            0
        } else {
            MAX_TICK_INTERVAL_MS / self.tick_interval_ms
        }
    }

    /// The tick interval as a [`Duration`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Whether this configuration ramps at all.
    pub fn is_ramping(&self) -> bool {
        self.ramp_period_minutes > 0
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparsable {}={:?}", key, raw);
            None
        }
    }
}
