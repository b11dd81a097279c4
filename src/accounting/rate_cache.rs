//! Cached pricing rates for yield-bearing pool tokens.
//!
//! Querying a rate provider on every operation is wasteful and exposes
//! every swap to provider latency and failure, so each token's rate is
//! cached with a caller-chosen lifetime. Two rates are kept:
//!
//! - `current_rate`: the most recently fetched value, used to scale
//!   balances for all math.
//! - `old_rate`: the value at the last join or exit. The gap between
//!   the two is yield accrued since that settlement point, which is
//!   what protocol yield fees are charged on.
//!
//! A refresh only ever touches `current_rate` and the expiry;
//! `old_rate` advances exclusively when a join or exit finalizes.
//! Collapsing the two on refresh would silently erase unharvested
//! yield between settlements.

use crate::amplification::Timestamp;
use crate::error::Result;
use crate::math::FixedPoint;
use crate::traits::RateProvider;

/// One token's cached rate pair and expiry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateCache {
    current_rate: FixedPoint,
    old_rate: FixedPoint,
    duration: u64,
    expires: Timestamp,
}

impl RateCache {
    /// Creates a cache seeded with a first rate; both stored rates
    /// start equal so no phantom yield exists at birth.
    #[must_use]
    pub fn new(rate: FixedPoint, duration: u64, now: Timestamp) -> Self {
        Self {
            current_rate: rate,
            old_rate: rate,
            duration,
            expires: now.saturating_add(duration),
        }
    }

    /// The rate used to scale balances.
    #[must_use]
    pub const fn current_rate(&self) -> FixedPoint {
        self.current_rate
    }

    /// The rate at the last join/exit settlement.
    #[must_use]
    pub const fn old_rate(&self) -> FixedPoint {
        self.old_rate
    }

    /// Whether the cached rate is stale at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires
    }

    /// Unconditionally fetches a fresh rate from `provider`.
    ///
    /// `old_rate` is left untouched.
    ///
    /// # Errors
    ///
    /// Propagates the provider's failure; on error the cache is
    /// unchanged.
    pub fn refresh(&mut self, provider: &dyn RateProvider, now: Timestamp) -> Result<()> {
        let rate = provider.get_rate()?;
        self.current_rate = rate;
        self.expires = now.saturating_add(self.duration);
        Ok(())
    }

    /// Fetches a fresh rate only if the cache has expired. Returns
    /// whether a fetch happened.
    ///
    /// # Errors
    ///
    /// Propagates the provider's failure; on error the cache is
    /// unchanged.
    pub fn refresh_if_expired(
        &mut self,
        provider: &dyn RateProvider,
        now: Timestamp,
    ) -> Result<bool> {
        if self.is_expired(now) {
            self.refresh(provider, now)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Changes the cache lifetime and forces an immediate refresh so
    /// the new lifetime starts from a fresh value.
    ///
    /// # Errors
    ///
    /// Propagates the provider's failure; on error the cache keeps its
    /// previous duration.
    pub fn set_duration(
        &mut self,
        duration: u64,
        provider: &dyn RateProvider,
        now: Timestamp,
    ) -> Result<()> {
        let rate = provider.get_rate()?;
        self.duration = duration;
        self.current_rate = rate;
        self.expires = now.saturating_add(duration);
        Ok(())
    }

    /// Marks the present as the new yield baseline. Called exactly
    /// once per join/exit, after fees on prior yield were settled.
    pub fn finalize_join_exit(&mut self) {
        self.old_rate = self.current_rate;
    }
}
