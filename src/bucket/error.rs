//! # Construction Errors
//!
//! The bucket has exactly one failure mode: being built from parameters
//! that make no sense. Once a bucket exists, admission and refill are
//! total and never fail.

use thiserror::Error;

/// Rejected bucket configuration.
///
/// Each variant names the parameter at fault and carries the value that was
/// supplied. Values are never clamped into range; the caller has to fix the
/// configuration and construct again.
///
/// ```rust
/// use ramper::{AdaptiveTokenBucket, ConfigurationError};
///
/// let err = AdaptiveTokenBucket::new(0, 5).unwrap_err();
/// assert_eq!(err, ConfigurationError::MaxCapacity(0));
/// assert_eq!(err.parameter(), "max_capacity");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// `max_capacity` was below 1.
    #[error("max_capacity must be at least 1, got {0}")]
    MaxCapacity(i64),

    /// `ramp_period_minutes` was negative.
    #[error("ramp_period_minutes cannot be negative, got {0}")]
    RampPeriod(i64),

    /// `tick_interval_ms` was zero or longer than one minute.
    #[error("tick_interval_ms must be between 1 and 60000, got {0}")]
    TickInterval(u64),
}

impl ConfigurationError {
    /// Name of the offending configuration parameter.
    pub fn parameter(&self) -> &'static str {
        match self {
            Self::MaxCapacity(_) => "max_capacity",
            Self::RampPeriod(_) => "ramp_period_minutes",
            Self::TickInterval(_) => "tick_interval_ms",
        }
    }
}
