//! # Bucket State Machine
//!
//! The lock-free-of-concerns heart of the bucket: plain counters and the two
//! transitions that mutate them. Synchronization lives in `core`, which owns
//! a `BucketState` behind a single mutex.
//!
//! ```text
//!     One tick:
//!
//!     utilization = available / capacity        (measured before refill)
//!
//!       > 0.90 ──► capacity -= ramp_step  (floor 1)
//!       < 0.40 ──► capacity += ramp_step  (ceiling max)
//!       else   ──► hold
//!
//!     available = min(available + max(capacity / ticks_per_minute, 1), capacity)
//! ```

use super::config::{
    BucketConfig, INITIAL_CAPACITY_DIVISOR, SCALE_DOWN_PERCENT, SCALE_UP_PERCENT,
};
use super::error::ConfigurationError;

/// Direction the capacity moved on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampDirection {
    /// Tokens were being drained; the ceiling grew.
    Up,
    /// Tokens were piling up; the ceiling shrank.
    Down,
    /// Utilization was inside the hysteresis band, the bucket does not ramp,
    /// or the ceiling was already at its bound.
    Hold,
}

/// What a single refill tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Capacity movement applied by this tick.
    pub direction: RampDirection,
    /// Capacity before the tick.
    pub previous_capacity: u64,
    /// Capacity after the tick.
    pub capacity: u64,
    /// Tokens credited by the refill, before capping at `capacity`.
    pub tokens_added: u64,
    /// Spendable tokens after the tick.
    pub available_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BucketState {
    max_capacity: u64,
    ramp_step: u64,
    ticks_per_minute: u64,
    current_capacity: u64,
    available_tokens: u64,
}

impl BucketState {
    /// Validates `config` and derives the ramp step and cold-start capacity.
    pub(crate) fn from_config(config: &BucketConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        // validate() guarantees both are positive / non-negative
        let max_capacity = config.max_capacity as u64;
        let ramp_minutes = config.ramp_period_minutes as u64;
        let ticks_per_minute = config.ticks_per_minute();

        let (ramp_step, current_capacity) = if ramp_minutes == 0 {
            (0, max_capacity)
        } else {
            let ticks = ramp_minutes.saturating_mul(ticks_per_minute);
            let step = (max_capacity / ticks).max(1);
            let start = (max_capacity / INITIAL_CAPACITY_DIVISOR).max(1);
            (step, start)
        };

        Ok(Self {
            max_capacity,
            ramp_step,
            ticks_per_minute,
            current_capacity,
            available_tokens: current_capacity,
        })
    }

    /// Spends one token if any are left.
    #[inline]
    pub(crate) fn try_take(&mut self) -> bool {
        if self.available_tokens > 0 {
            self.available_tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Runs one ramp adjustment followed by one refill.
    pub(crate) fn tick(&mut self) -> TickOutcome {
        let previous_capacity = self.current_capacity;
        let direction = self.ramp();
        let tokens_added = self.replenish();

        TickOutcome {
            direction,
            previous_capacity,
            capacity: self.current_capacity,
            tokens_added,
            available_tokens: self.available_tokens,
        }
    }

    /// Moves the ceiling one step based on the utilization left since the
    /// previous tick.
    fn ramp(&mut self) -> RampDirection {
        if self.ramp_step == 0 {
            return RampDirection::Hold;
        }

        let before = self.current_capacity;
        let tokens = self.available_tokens as u128 * 100;
        let capacity = self.current_capacity as u128;

        if tokens > capacity * SCALE_DOWN_PERCENT {
            self.current_capacity = self.current_capacity.saturating_sub(self.ramp_step).max(1);
        } else if tokens < capacity * SCALE_UP_PERCENT {
            self.current_capacity = self
                .current_capacity
                .saturating_add(self.ramp_step)
                .min(self.max_capacity);
        }

        match self.current_capacity.cmp(&before) {
            std::cmp::Ordering::Greater => RampDirection::Up,
            std::cmp::Ordering::Less => RampDirection::Down,
            std::cmp::Ordering::Equal => RampDirection::Hold,
        }
    }

    /// Credits one tick's worth of tokens against the post-ramp capacity.
    fn replenish(&mut self) -> u64 {
        let tokens_to_add = (self.current_capacity / self.ticks_per_minute).max(1);
        self.available_tokens = self
            .available_tokens
            .saturating_add(tokens_to_add)
            .min(self.current_capacity);
        tokens_to_add
    }

    #[inline]
    pub(crate) fn max_capacity(&self) -> u64 {
        self.max_capacity
    }

    #[inline]
    pub(crate) fn ramp_step(&self) -> u64 {
        self.ramp_step
    }

    #[inline]
    pub(crate) fn ticks_per_minute(&self) -> u64 {
        self.ticks_per_minute
    }

    #[inline]
    pub(crate) fn current_capacity(&self) -> u64 {
        self.current_capacity
    }

    #[inline]
    pub(crate) fn available_tokens(&self) -> u64 {
        self.available_tokens
    }

    #[cfg(test)]
    pub(crate) fn set_for_test(&mut self, capacity: u64, tokens: u64) {
        self.current_capacity = capacity;
        self.available_tokens = tokens;
    }
}
