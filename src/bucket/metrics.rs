//! # Bucket Metrics
//!
//! Read-only views of what the bucket has been doing: a point-in-time
//! [`BucketMetrics`] snapshot and a [`CapacityGauge`] hook that receives the
//! current ceiling after every tick.
//!
//! ```text
//!     Metrics Dashboard:
//!     ┌─────────────────────────────────────┐
//!     │  Acceptance: 85%                    │
//!     │  Capacity:   420/600 (70% ramped)   │
//!     │  Tokens:     12/420                 │
//!     │  Ticks:      31 (↑14 ↓2)            │
//!     │  Health:     ⚠️ Degraded            │
//!     └─────────────────────────────────────┘
//! ```
//!
//! Nothing in this module feeds back into admission decisions.

use std::fmt;
use std::sync::Arc;

/// Receives the bucket's current capacity after every refill tick.
///
/// Implemented for [`prometheus::IntGauge`], so a registered gauge can be
/// handed straight to the builder:
///
/// ```rust
/// use prometheus::{IntGauge, Registry};
/// use ramper::AdaptiveBucketBuilder;
///
/// let gauge = IntGauge::new("bucket_capacity", "Current token bucket capacity").unwrap();
/// let registry = Registry::new();
/// registry.register(Box::new(gauge.clone())).unwrap();
///
/// let bucket = AdaptiveBucketBuilder::new()
///     .max_capacity(100)
///     .ramp_period_minutes(1)
///     .capacity_gauge(gauge.clone())
///     .build()
///     .unwrap();
///
/// assert_eq!(gauge.get(), 10);
/// bucket.tick();
/// assert_eq!(gauge.get() as u64, bucket.current_capacity());
/// ```
pub trait CapacityGauge: Send + Sync {
    /// Records the latest capacity, in tokens per minute.
    fn set_capacity(&self, capacity: u64);
}

impl CapacityGauge for prometheus::IntGauge {
    fn set_capacity(&self, capacity: u64) {
        self.set(i64::try_from(capacity).unwrap_or(i64::MAX));
    }
}

impl<G: CapacityGauge + ?Sized> CapacityGauge for Arc<G> {
    fn set_capacity(&self, capacity: u64) {
        (**self).set_capacity(capacity)
    }
}

/// Snapshot of an adaptive bucket's counters and state.
///
/// `current_capacity` and `available_tokens` are read together under the
/// bucket's lock; the lifetime counters are read separately and may be a
/// few operations ahead or behind.
///
/// ```rust
/// use ramper::AdaptiveTokenBucket;
///
/// let bucket = AdaptiveTokenBucket::new(20, 1).unwrap();
/// bucket.accept();
/// bucket.accept();
/// bucket.accept();
///
/// let metrics = bucket.metrics();
/// assert_eq!(metrics.total_accepted, 2);
/// assert_eq!(metrics.total_rejected, 1);
/// println!("{}", metrics.summary());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BucketMetrics {
    /// Admission checks that were granted a token.
    pub total_accepted: u64,

    /// Admission checks turned away for lack of tokens.
    pub total_rejected: u64,

    /// Refill ticks applied so far.
    pub total_ticks: u64,

    /// Ticks that grew the capacity.
    pub scale_ups: u64,

    /// Ticks that shrank the capacity.
    pub scale_downs: u64,

    /// Capacity ceiling right now.
    pub current_capacity: u64,

    /// Configured ceiling the capacity may ramp to.
    pub max_capacity: u64,

    /// Spendable tokens right now.
    pub available_tokens: u64,

    /// Capacity change per ramping tick. Zero when ramping is disabled.
    pub ramp_step: u64,

    /// Monotonic epoch milliseconds of the last tick, or 0 if none ran yet.
    pub last_tick_ms: u64,
}

impl BucketMetrics {
    /// Accepted plus rejected admission checks.
    #[inline]
    pub fn total_requests(&self) -> u64 {
        self.total_accepted + self.total_rejected
    }

    /// Fraction of admission checks that were accepted, 1.0 before any request.
    #[inline]
    pub fn acceptance_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            1.0
        } else {
            self.total_accepted as f64 / total as f64
        }
    }

    /// Fraction of admission checks that were rejected.
    #[inline]
    pub fn rejection_rate(&self) -> f64 {
        1.0 - self.acceptance_rate()
    }

    /// Available tokens over current capacity.
    ///
    /// This is the ratio the ramp compares against its thresholds: near 1.0
    /// means demand is light, near 0.0 means callers are draining the bucket.
    #[inline]
    pub fn utilization(&self) -> f64 {
        if self.current_capacity == 0 {
            0.0
        } else {
            self.available_tokens as f64 / self.current_capacity as f64
        }
    }

    /// Current capacity as a fraction of the maximum.
    #[inline]
    pub fn ramp_progress(&self) -> f64 {
        if self.max_capacity == 0 {
            0.0
        } else {
            self.current_capacity as f64 / self.max_capacity as f64
        }
    }

    /// Whether the capacity has reached its ceiling.
    #[inline]
    pub fn is_fully_ramped(&self) -> bool {
        self.current_capacity >= self.max_capacity
    }

    /// Rough health assessment.
    ///
    /// Heavy rejection while the bucket can still grow is the ramp doing its
    /// job, so it only counts as degraded. Heavy rejection at the ceiling
    /// means demand exceeds what the bucket is allowed to serve.
    ///
    /// ```rust
    /// use ramper::{AdaptiveTokenBucket, HealthStatus};
    ///
    /// let bucket = AdaptiveTokenBucket::new(100, 0).unwrap();
    /// assert_eq!(bucket.metrics().health_status(), HealthStatus::Healthy);
    /// ```
    pub fn health_status(&self) -> HealthStatus {
        let rejection = self.rejection_rate();
        if rejection > 0.5 && self.is_fully_ramped() {
            HealthStatus::Critical
        } else if rejection > 0.1 || self.available_tokens == 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Multi-line report suitable for logs.
    pub fn summary(&self) -> String {
        format!(
            "AdaptiveTokenBucket Metrics:\n\
             ├─ Admission:\n\
             │  ├─ Accepted: {}\n\
             │  ├─ Rejected: {}\n\
             │  └─ Acceptance Rate: {:.2}%\n\
             ├─ Capacity:\n\
             │  ├─ Current: {}/{} ({:.2}% ramped)\n\
             │  ├─ Available Tokens: {}\n\
             │  ├─ Utilization: {:.2}%\n\
             │  └─ Ramp Step: {}\n\
             ├─ Ticks:\n\
             │  ├─ Total: {}\n\
             │  ├─ Scale Ups: {}\n\
             │  └─ Scale Downs: {}\n\
             └─ Health: {:?}",
            self.total_accepted,
            self.total_rejected,
            self.acceptance_rate() * 100.0,
            self.current_capacity,
            self.max_capacity,
            self.ramp_progress() * 100.0,
            self.available_tokens,
            self.utilization() * 100.0,
            self.ramp_step,
            self.total_ticks,
            self.scale_ups,
            self.scale_downs,
            self.health_status(),
        )
    }
}

impl fmt::Display for BucketMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Health indicator derived from a [`BucketMetrics`] snapshot.
///
/// ```text
///     Healthy ──────► Demand is being served
///        │
///     Degraded ─────► Rejecting, but still ramping or momentarily empty
///        │
///     Critical ─────► Rejecting most requests at full capacity
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Rejection rate at or below 10% and tokens on hand.
    Healthy,

    /// Rejecting more than 10% of requests, or no tokens left right now.
    Degraded,

    /// Rejecting more than half of all requests with no room left to ramp.
    Critical,
}

impl HealthStatus {
    /// True for anything other than [`HealthStatus::Healthy`].
    pub fn is_unhealthy(&self) -> bool {
        !matches!(self, Self::Healthy)
    }

    /// Operator guidance for this status.
    pub fn suggested_action(&self) -> &'static str {
        match self {
            Self::Healthy => "No action needed",
            Self::Degraded => "Capacity is adapting; watch the ramp progress",
            Self::Critical => "Demand exceeds max capacity: raise the ceiling or shed load",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "✅ Healthy"),
            Self::Degraded => write!(f, "⚠️ Degraded"),
            Self::Critical => write!(f, "🔴 Critical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn snapshot() -> BucketMetrics {
        BucketMetrics {
            total_accepted: 80,
            total_rejected: 20,
            total_ticks: 12,
            scale_ups: 7,
            scale_downs: 1,
            current_capacity: 300,
            max_capacity: 600,
            available_tokens: 150,
            ramp_step: 20,
            last_tick_ms: 0,
        }
    }

    #[test]
    fn test_metrics_calculations() {
        let m = snapshot();
        assert_eq!(m.total_requests(), 100);
        assert!((m.acceptance_rate() - 0.8).abs() < f64::EPSILON);
        assert!((m.rejection_rate() - 0.2).abs() < 1e-9);
        assert!((m.utilization() - 0.5).abs() < f64::EPSILON);
        assert!((m.ramp_progress() - 0.5).abs() < f64::EPSILON);
        assert!(!m.is_fully_ramped());
    }

    #[test]
    fn test_edge_cases() {
        let m = BucketMetrics {
            total_accepted: 0,
            total_rejected: 0,
            current_capacity: 0,
            max_capacity: 0,
            ..snapshot()
        };
        assert_eq!(m.acceptance_rate(), 1.0);
        assert_eq!(m.utilization(), 0.0);
        assert_eq!(m.ramp_progress(), 0.0);
    }

    #[test]
    fn test_health_status() {
        let healthy = BucketMetrics {
            total_accepted: 95,
            total_rejected: 5,
            ..snapshot()
        };
        assert_eq!(healthy.health_status(), HealthStatus::Healthy);

        // Rejecting heavily but still below the ceiling
        let ramping = BucketMetrics {
            total_accepted: 10,
            total_rejected: 90,
            ..snapshot()
        };
        assert_eq!(ramping.health_status(), HealthStatus::Degraded);

        let saturated = BucketMetrics {
            current_capacity: 600,
            ..ramping.clone()
        };
        assert_eq!(saturated.health_status(), HealthStatus::Critical);

        let empty = BucketMetrics {
            available_tokens: 0,
            ..healthy
        };
        assert_eq!(empty.health_status(), HealthStatus::Degraded);
    }

    #[test]
    fn test_health_status_methods() {
        assert!(!HealthStatus::Healthy.is_unhealthy());
        assert!(HealthStatus::Degraded.is_unhealthy());
        assert!(HealthStatus::Critical.is_unhealthy());
        assert_eq!(HealthStatus::Healthy.suggested_action(), "No action needed");
        assert_eq!(HealthStatus::Critical.to_string(), "🔴 Critical");
    }

    #[test]
    fn test_metrics_display() {
        let m = snapshot();
        let text = m.to_string();
        assert!(text.contains("Accepted: 80"));
        assert!(text.contains("Current: 300/600 (50.00% ramped)"));
        assert!(text.contains("Scale Ups: 7"));
        assert_eq!(text, m.summary());
    }

    #[test]
    fn test_int_gauge() {
        let gauge = prometheus::IntGauge::new("capacity", "capacity").unwrap();
        gauge.set_capacity(42);
        assert_eq!(gauge.get(), 42);
        gauge.set_capacity(u64::MAX);
        assert_eq!(gauge.get(), i64::MAX);
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<u64>>);

    impl CapacityGauge for Recording {
        fn set_capacity(&self, capacity: u64) {
            self.0.lock().push(capacity);
        }
    }

    #[test]
    fn test_arc_forwarding() {
        let inner = Arc::new(Recording::default());
        let shared: Arc<dyn CapacityGauge> = inner.clone();
        shared.set_capacity(7);
        Arc::new(shared).set_capacity(9);
        assert_eq!(*inner.0.lock(), vec![7, 9]);
    }
}
