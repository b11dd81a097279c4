//! Pool aggregates: state, validation, and operation flow on top of
//! the pure math modules.
//!
//! Both pool kinds follow the same operation shape: take the entry
//! guard, validate the request, settle protocol fees accrued since the
//! last settlement, run the math on local copies, and only then commit
//! balances and share-supply changes. An error anywhere leaves the
//! pool exactly as it was.

mod guard;
#[cfg(test)]
mod proptest_properties;
mod stable;
mod weighted;

pub use guard::{EntryLock, ReentrancyGuard};
pub use stable::{StablePool, StablePoolParams, StableTokenParams};
pub use weighted::{WeightedPool, WeightedPoolParams};

use crate::error::{AmmError, Result};
use crate::math::FixedPoint;

/// Swap fees below 0.0001% are indistinguishable from zero after
/// rounding.
pub const MIN_SWAP_FEE: FixedPoint = FixedPoint::from_wei_u64(1_000_000_000_000);

/// Swap fees above 10% stop being fees.
pub const MAX_SWAP_FEE: FixedPoint = FixedPoint::from_wei_u64(100_000_000_000_000_000);

fn validate_swap_fee(swap_fee: FixedPoint) -> Result<()> {
    if swap_fee < MIN_SWAP_FEE {
        return Err(AmmError::InvalidFee("swap fee below 0.0001%"));
    }
    if swap_fee > MAX_SWAP_FEE {
        return Err(AmmError::InvalidFee("swap fee above 10%"));
    }
    Ok(())
}
