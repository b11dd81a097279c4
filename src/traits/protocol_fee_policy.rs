//! Source of the protocol's cut of pool earnings.

use core::fmt;

use crate::error::Result;
use crate::math::FixedPoint;

/// Reports the protocol's fee percentages on swap-fee and yield
/// growth.
///
/// Pools never consult the policy during swaps or liquidity changes;
/// an explicit administrative cache update pulls fresh values, so a
/// mid-operation policy change can never split one operation across
/// two fee regimes.
pub trait ProtocolFeePolicy: fmt::Debug {
    /// The protocol's percentage of swap-fee growth.
    ///
    /// # Errors
    ///
    /// Implementations should surface upstream failures as
    /// [`AmmError::RateProviderFailure`](crate::error::AmmError::RateProviderFailure).
    fn swap_fee_percentage(&self) -> Result<FixedPoint>;

    /// The protocol's percentage of yield growth.
    ///
    /// # Errors
    ///
    /// Same as [`swap_fee_percentage`](Self::swap_fee_percentage).
    fn yield_fee_percentage(&self) -> Result<FixedPoint>;
}

/// A policy pinned to fixed percentages. Useful where governance
/// changes fees rarely and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantFeePolicy {
    swap: FixedPoint,
    yield_: FixedPoint,
}

impl ConstantFeePolicy {
    /// Creates a policy pinned to the given percentages.
    #[must_use]
    pub const fn new(swap: FixedPoint, yield_: FixedPoint) -> Self {
        Self { swap, yield_ }
    }
}

impl ProtocolFeePolicy for ConstantFeePolicy {
    fn swap_fee_percentage(&self) -> Result<FixedPoint> {
        Ok(self.swap)
    }

    fn yield_fee_percentage(&self) -> Result<FixedPoint> {
        Ok(self.yield_)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn constant_policy_reports_its_percentages() {
        let swap = FixedPoint::from_wei(100_000_000_000_000_000);
        let policy = ConstantFeePolicy::new(swap, FixedPoint::ZERO);
        let Ok(reported) = policy.swap_fee_percentage() else {
            panic!("expected Ok");
        };
        assert_eq!(reported, swap);
        let Ok(reported) = policy.yield_fee_percentage() else {
            panic!("expected Ok");
        };
        assert_eq!(reported, FixedPoint::ZERO);
    }
}
