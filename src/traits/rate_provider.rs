//! Pricing-rate source for tokens whose face value appreciates.

use core::fmt;

use crate::error::Result;
use crate::math::FixedPoint;

/// Reports the current exchange rate between a yield-bearing token and
/// its underlying asset, as a 10^18-scaled factor.
///
/// A pool consults the provider when a token's rate cache expires; a
/// failing provider aborts the enclosing operation without touching
/// the cache, so a flaky source can never poison stored rates.
pub trait RateProvider: fmt::Debug {
    /// Returns the current rate. A rate of 1.0 means the token trades
    /// at par with its underlying.
    ///
    /// # Errors
    ///
    /// Implementations should surface upstream failures as
    /// [`AmmError::RateProviderFailure`](crate::error::AmmError::RateProviderFailure).
    fn get_rate(&self) -> Result<FixedPoint>;
}

/// A provider that always reports the same rate. Useful for tokens
/// with a fixed redemption ratio and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantRateProvider {
    rate: FixedPoint,
}

impl ConstantRateProvider {
    /// Creates a provider pinned to `rate`.
    #[must_use]
    pub const fn new(rate: FixedPoint) -> Self {
        Self { rate }
    }
}

impl RateProvider for ConstantRateProvider {
    fn get_rate(&self) -> Result<FixedPoint> {
        Ok(self.rate)
    }
}
