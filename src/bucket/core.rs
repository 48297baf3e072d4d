//! # Adaptive Token Bucket
//!
//! The shared, thread-safe bucket. Admission checks and the background refill
//! thread both go through one mutex around the bucket state; everything
//! else (lifetime counters, the capacity gauge) sits outside the lock and is
//! purely informational.
//!
//! ```text
//!     accept() ──┐
//!     accept() ──┤                ┌──────────────────────┐
//!     accept() ──┼──► Mutex ────► │ BucketState          │
//!                │      ▲         │  current_capacity    │
//!                │      │         │  available_tokens    │
//!                │      │         └──────────────────────┘
//!                │   tick() every tick_interval
//!                │      │
//!                │  "ramper-refill" thread ◄── stop signal (mpsc)
//! ```
//!
//! ## Refill policy
//!
//! Tokens are only ever replenished by [`AdaptiveTokenBucket::tick`], which
//! the refill thread calls on a fixed schedule. `accept` never looks at the
//! clock, so the hot path is a lock, a compare and a decrement.

use super::{
    config::BucketConfig,
    error::ConfigurationError,
    metrics::{BucketMetrics, CapacityGauge},
    state::{BucketState, RampDirection, TickOutcome},
    utils::{current_time_ms, CacheAligned},
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// State shared between the bucket handle and its refill thread.
struct Shared {
    state: Mutex<BucketState>,

    // Informational counters, never read by the algorithm
    total_accepted: CacheAligned<AtomicU64>,
    total_rejected: CacheAligned<AtomicU64>,
    total_ticks: AtomicU64,
    scale_ups: AtomicU64,
    scale_downs: AtomicU64,
    last_tick_ms: AtomicU64,

    gauge: Option<Arc<dyn CapacityGauge>>,
}

impl Shared {
    #[inline]
    fn accept(&self) -> bool {
        let (accepted, left) = {
            let mut state = self.state.lock();
            let accepted = state.try_take();
            (accepted, state.available_tokens())
        };

        if accepted {
            self.total_accepted.fetch_add(1, Ordering::Relaxed);
            trace!("Token taken from bucket, {} left", left);
        } else {
            self.total_rejected.fetch_add(1, Ordering::Relaxed);
            trace!("No tokens available");
        }
        accepted
    }

    fn tick(&self) -> TickOutcome {
        let outcome = self.state.lock().tick();

        self.total_ticks.fetch_add(1, Ordering::Relaxed);
        self.last_tick_ms.store(current_time_ms(), Ordering::Relaxed);
        match outcome.direction {
            RampDirection::Up => {
                self.scale_ups.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Scaled capacity up {} -> {}, added {} tokens ({} available)",
                    outcome.previous_capacity,
                    outcome.capacity,
                    outcome.tokens_added,
                    outcome.available_tokens
                );
            }
            RampDirection::Down => {
                self.scale_downs.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Scaled capacity down {} -> {}, added {} tokens ({} available)",
                    outcome.previous_capacity,
                    outcome.capacity,
                    outcome.tokens_added,
                    outcome.available_tokens
                );
            }
            RampDirection::Hold => {
                debug!(
                    "Capacity held at {}, added {} tokens ({} available)",
                    outcome.capacity, outcome.tokens_added, outcome.available_tokens
                );
            }
        }

        self.publish(outcome.capacity);
        outcome
    }

    #[inline]
    fn publish(&self, capacity: u64) {
        if let Some(gauge) = &self.gauge {
            gauge.set_capacity(capacity);
        }
    }
}

/// Handle to a running refill thread.
struct Refiller {
    handle: thread::JoinHandle<()>,
    stop_tx: mpsc::Sender<()>,
}

/// Token bucket whose capacity ramps up and down with observed demand.
///
/// A new bucket starts at 10% of `max_capacity` (or at `max_capacity` when
/// the ramp period is zero). Every tick it compares its leftover tokens with
/// its capacity: a drained bucket grows by `ramp_step`, an idle one shrinks
/// by `ramp_step`, and anything in between holds. It then tops up
/// `capacity / ticks_per_minute` tokens.
///
/// ## Example
///
/// ```rust
/// use ramper::AdaptiveTokenBucket;
///
/// let bucket = AdaptiveTokenBucket::new(20, 1).unwrap();
/// assert_eq!(bucket.current_capacity(), 2);
///
/// assert!(bucket.accept());
/// assert!(bucket.accept());
/// assert!(!bucket.accept());
///
/// // Drained bucket: the next tick grows the ceiling and refills
/// bucket.tick();
/// assert_eq!(bucket.current_capacity(), 5);
/// assert!(bucket.accept());
/// ```
///
/// ## Background refill
///
/// ```rust
/// use ramper::{AdaptiveTokenBucket, BucketConfig};
/// use std::sync::Arc;
///
/// let config = BucketConfig::new(600, 5).with_tick_interval_ms(100);
/// let bucket = Arc::new(AdaptiveTokenBucket::with_config(config).unwrap());
///
/// bucket.start().unwrap();
/// // ... call bucket.accept() from request handlers ...
/// bucket.stop();
/// ```
pub struct AdaptiveTokenBucket {
    shared: Arc<Shared>,
    config: BucketConfig,
    refiller: Mutex<Option<Refiller>>,
}

impl AdaptiveTokenBucket {
    /// Creates a bucket ticking at the default 10 second interval.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::MaxCapacity`] if `max_capacity < 1`,
    /// [`ConfigurationError::RampPeriod`] if `ramp_period_minutes < 0`.
    ///
    /// ```rust
    /// use ramper::{AdaptiveTokenBucket, ConfigurationError};
    ///
    /// let bucket = AdaptiveTokenBucket::new(100, 1).unwrap();
    /// assert_eq!(bucket.current_capacity(), 10);
    /// assert_eq!(bucket.ramp_step(), 16);
    ///
    /// assert!(matches!(
    ///     AdaptiveTokenBucket::new(-1, 5),
    ///     Err(ConfigurationError::MaxCapacity(-1))
    /// ));
    /// ```
    pub fn new(max_capacity: i64, ramp_period_minutes: i64) -> Result<Self, ConfigurationError> {
        Self::with_config(BucketConfig::new(max_capacity, ramp_period_minutes))
    }

    /// Creates a bucket from a full configuration.
    ///
    /// # Errors
    ///
    /// Any [`ConfigurationError`] reported by [`BucketConfig::validate`].
    pub fn with_config(config: BucketConfig) -> Result<Self, ConfigurationError> {
        Self::from_parts(config, None)
    }

    pub(crate) fn from_parts(
        config: BucketConfig,
        gauge: Option<Arc<dyn CapacityGauge>>,
    ) -> Result<Self, ConfigurationError> {
        let state = BucketState::from_config(&config)?;
        debug!(
            "Created adaptive bucket (max: {}, start: {}, step: {}, ticks/min: {})",
            state.max_capacity(),
            state.current_capacity(),
            state.ramp_step(),
            state.ticks_per_minute()
        );

        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            total_accepted: CacheAligned::new(AtomicU64::new(0)),
            total_rejected: CacheAligned::new(AtomicU64::new(0)),
            total_ticks: AtomicU64::new(0),
            scale_ups: AtomicU64::new(0),
            scale_downs: AtomicU64::new(0),
            last_tick_ms: AtomicU64::new(0),
            gauge,
        });
        shared.publish(shared.state.lock().current_capacity());

        Ok(Self {
            shared,
            config,
            refiller: Mutex::new(None),
        })
    }

    /// Admission check: spends one token and returns `true`, or returns
    /// `false` without spending anything when the bucket is empty.
    ///
    /// Never waits for tokens and never refills; safe to call from any number
    /// of threads, each available token goes to exactly one caller.
    #[inline]
    pub fn accept(&self) -> bool {
        self.shared.accept()
    }

    /// Runs one ramp adjustment and refill right now.
    ///
    /// The refill thread calls this once per interval. Calling it by hand is
    /// useful for simulations and for driving the bucket from an external
    /// scheduler instead of [`start`](Self::start).
    pub fn tick(&self) -> TickOutcome {
        self.shared.tick()
    }

    /// Spawns the background refill thread.
    ///
    /// Calling this while the thread is already running logs a warning and
    /// does nothing. A bucket can be started again after [`stop`](Self::stop).
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread could not be spawned.
    pub fn start(&self) -> std::io::Result<()> {
        let mut refiller = self.refiller.lock();
        if refiller.is_some() {
            warn!("Refill thread already running, ignoring start");
            return Ok(());
        }

        let (stop_tx, stop_rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let interval = self.config.tick_interval();

        let handle = thread::Builder::new()
            .name("ramper-refill".to_string())
            .spawn(move || run_refill(&shared, interval, &stop_rx))?;

        *refiller = Some(Refiller { handle, stop_tx });
        Ok(())
    }

    /// Stops the background refill thread and waits for it to exit.
    ///
    /// A tick already in progress finishes first. Once this returns no
    /// further ticks happen, so capacity and tokens stay where they are
    /// until the bucket is started again. Calling it on a bucket that is not
    /// running is a no-op.
    pub fn stop(&self) {
        let refiller = self.refiller.lock().take();
        if let Some(Refiller { handle, stop_tx }) = refiller {
            // A send error means the thread is already gone
            let _ = stop_tx.send(());
            if handle.join().is_err() {
                warn!("Refill thread panicked before stopping");
            }
        }
    }

    /// Whether the refill thread is running.
    pub fn is_running(&self) -> bool {
        self.refiller.lock().is_some()
    }

    /// Current capacity ceiling, in tokens per minute.
    pub fn current_capacity(&self) -> u64 {
        self.shared.state.lock().current_capacity()
    }

    /// Tokens that can be spent right now.
    pub fn available_tokens(&self) -> u64 {
        self.shared.state.lock().available_tokens()
    }

    /// Ceiling the capacity may ramp up to.
    pub fn max_capacity(&self) -> u64 {
        self.shared.state.lock().max_capacity()
    }

    /// Capacity change per ramping tick, 0 when ramping is disabled.
    pub fn ramp_step(&self) -> u64 {
        self.shared.state.lock().ramp_step()
    }

    /// Refill ticks per minute.
    pub fn ticks_per_minute(&self) -> u64 {
        self.shared.state.lock().ticks_per_minute()
    }

    /// Configured ramp period in minutes.
    pub fn ramp_period_minutes(&self) -> u64 {
        self.config.ramp_period_minutes as u64
    }

    /// Time between refill ticks.
    pub fn tick_interval(&self) -> Duration {
        self.config.tick_interval()
    }

    /// The configuration this bucket was built from.
    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    /// Snapshot of the bucket's counters and state.
    pub fn metrics(&self) -> BucketMetrics {
        let (current_capacity, available_tokens, max_capacity, ramp_step) = {
            let state = self.shared.state.lock();
            (
                state.current_capacity(),
                state.available_tokens(),
                state.max_capacity(),
                state.ramp_step(),
            )
        };

        BucketMetrics {
            total_accepted: self.shared.total_accepted.load(Ordering::Relaxed),
            total_rejected: self.shared.total_rejected.load(Ordering::Relaxed),
            total_ticks: self.shared.total_ticks.load(Ordering::Relaxed),
            scale_ups: self.shared.scale_ups.load(Ordering::Relaxed),
            scale_downs: self.shared.scale_downs.load(Ordering::Relaxed),
            current_capacity,
            max_capacity,
            available_tokens,
            ramp_step,
            last_tick_ms: self.shared.last_tick_ms.load(Ordering::Relaxed),
        }
    }
}

/// Refill loop: tick on a fixed schedule until told to stop.
///
/// Deadlines advance by whole intervals so the cadence does not drift with
/// tick duration. If the thread falls more than an interval behind it
/// resynchronizes instead of firing a burst of catch-up ticks.
fn run_refill(shared: &Shared, interval: Duration, stop_rx: &mpsc::Receiver<()>) {
    info!("Started refill thread (interval: {}ms)", interval.as_millis());

    let mut next = Instant::now() + interval;
    loop {
        let wait = next.saturating_duration_since(Instant::now());
        match stop_rx.recv_timeout(wait) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                info!("Refill thread stopping");
                break;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                shared.tick();

                next += interval;
                let now = Instant::now();
                if next < now {
                    next = now + interval;
                }
            }
        }
    }
}

impl Drop for AdaptiveTokenBucket {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for AdaptiveTokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("AdaptiveTokenBucket")
            .field("max_capacity", &state.max_capacity())
            .field("current_capacity", &state.current_capacity())
            .field("available_tokens", &state.available_tokens())
            .field("ramp_step", &state.ramp_step())
            .field("tick_interval_ms", &self.config.tick_interval_ms)
            .finish()
    }
}
