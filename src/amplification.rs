//! Amplification coefficient for stable pools, with gradual ramping.
//!
//! The amplification parameter `A` controls how flat the stable curve
//! is around balance. Abrupt changes to `A` move the curve under open
//! positions, so changes are applied as a linear ramp over at least a
//! day, and the value may at most double (or halve) per day of ramp
//! duration.
//!
//! Values are stored pre-scaled by [`AMP_PRECISION`](crate::math::stable::AMP_PRECISION)
//! so interpolation between adjacent integer values stays smooth.

use crate::error::{AmmError, Result};
use crate::math::stable::AMP_PRECISION;

/// Smallest allowed amplification value (unscaled).
pub const MIN_AMP: u64 = 1;

/// Largest allowed amplification value (unscaled).
pub const MAX_AMP: u64 = 5_000;

/// A ramp must run for at least one day.
pub const MIN_RAMP_DURATION: u64 = 86_400;

/// The value may change by at most this factor per day of ramp.
const MAX_DAILY_RATE: u64 = 2;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// An amplification value that may be mid-ramp.
///
/// [`value_at`](Self::value_at) reads the interpolated value for any
/// timestamp; [`start_ramp`](Self::start_ramp) and
/// [`stop_ramp`](Self::stop_ramp) mutate the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmplificationParameter {
    start_value: u64,
    end_value: u64,
    start_time: Timestamp,
    end_time: Timestamp,
}

impl AmplificationParameter {
    /// Creates a steady (non-ramping) parameter from an unscaled value.
    ///
    /// # Errors
    ///
    /// [`AmmError::InvalidAmplification`] if `value` is outside
    /// `[MIN_AMP, MAX_AMP]`.
    pub fn new(value: u64) -> Result<Self> {
        if !(MIN_AMP..=MAX_AMP).contains(&value) {
            return Err(AmmError::InvalidAmplification("value outside [1, 5000]"));
        }
        let scaled = value * AMP_PRECISION;
        Ok(Self {
            start_value: scaled,
            end_value: scaled,
            start_time: 0,
            end_time: 0,
        })
    }

    /// Returns the pre-scaled value at `now` plus whether a ramp is
    /// still in progress.
    #[must_use]
    pub fn value_at(&self, now: Timestamp) -> (u64, bool) {
        if now >= self.end_time {
            return (self.end_value, false);
        }
        // now < end_time implies a ramp was scheduled with
        // start_time < end_time, so the duration is non-zero.
        let elapsed = u128::from(now.saturating_sub(self.start_time));
        let duration = u128::from(self.end_time - self.start_time);
        let value = if self.end_value >= self.start_value {
            let delta = u128::from(self.end_value - self.start_value);
            self.start_value + (delta * elapsed / duration) as u64
        } else {
            let delta = u128::from(self.start_value - self.end_value);
            self.start_value - (delta * elapsed / duration) as u64
        };
        (value, true)
    }

    /// Begins a linear ramp from the current value to `end_value`
    /// (unscaled), finishing at `end_time`.
    ///
    /// # Errors
    ///
    /// [`AmmError::InvalidAmplification`] if the target is out of
    /// range, the duration is under a day, a ramp is already running,
    /// or the change rate exceeds 2x per day.
    pub fn start_ramp(
        &mut self,
        end_value: u64,
        now: Timestamp,
        end_time: Timestamp,
    ) -> Result<()> {
        if !(MIN_AMP..=MAX_AMP).contains(&end_value) {
            return Err(AmmError::InvalidAmplification("target outside [1, 5000]"));
        }
        let duration = end_time
            .checked_sub(now)
            .ok_or(AmmError::InvalidAmplification("end time in the past"))?;
        if duration < MIN_RAMP_DURATION {
            return Err(AmmError::InvalidAmplification("ramp shorter than one day"));
        }

        let (current, updating) = self.value_at(now);
        if updating {
            return Err(AmmError::InvalidAmplification("ramp already in progress"));
        }

        // Rate cap: scaled by duration, the value may at most double
        // or halve per day.
        let target = end_value * AMP_PRECISION;
        let (larger, smaller) = if target >= current {
            (target, current)
        } else {
            (current, target)
        };
        let allowed = u128::from(smaller) * u128::from(MAX_DAILY_RATE) * u128::from(duration)
            / u128::from(MIN_RAMP_DURATION);
        if u128::from(larger) > allowed {
            return Err(AmmError::InvalidAmplification("change faster than 2x per day"));
        }

        self.start_value = current;
        self.end_value = target;
        self.start_time = now;
        self.end_time = end_time;
        Ok(())
    }

    /// Freezes the parameter at its current interpolated value,
    /// cancelling any ramp in progress.
    pub fn stop_ramp(&mut self, now: Timestamp) {
        let (current, _) = self.value_at(now);
        self.start_value = current;
        self.end_value = current;
        self.start_time = now;
        self.end_time = now;
    }
}
