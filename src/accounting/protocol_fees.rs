//! The protocol's cut of pool growth, settled by minting shares.
//!
//! Between two join/exit settlements a stable pool's invariant grows
//! for three reasons: swap fees, yield on rate-bearing tokens, and the
//! liquidity change itself. Only the first two owe protocol fees, and
//! each at its own percentage, so growth is decomposed with three
//! invariant measurements:
//!
//! | Invariant | Balances measured with |
//! |-----------|------------------------|
//! | `swap_fee_growth` | every token at its old (last-settlement) rate |
//! | `total_non_exempt_growth` | exempt tokens at old rates, the rest current |
//! | `total_growth` | every token at its current rate |
//!
//! Swap-fee growth is `swap_fee_growth - last_invariant` (yield cannot
//! appear when all rates are pinned to their old values); non-exempt
//! yield growth is `total_non_exempt_growth - swap_fee_growth`. Each
//! delta, as a share of `total_growth`, times its fee percentage,
//! gives the protocol's ownership of the pool, which is collected by
//! minting new shares that dilute everyone else by exactly that
//! ownership.

use crate::error::{AmmError, Result};
use crate::math::FixedPoint;

/// Protocol fee percentages are capped at 50%.
pub const MAX_PROTOCOL_FEE: FixedPoint = FixedPoint::from_wei_u64(500_000_000_000_000_000);

/// The protocol's configured cut of swap-fee growth and yield growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtocolFeePercentages {
    swap: FixedPoint,
    yield_: FixedPoint,
}

impl ProtocolFeePercentages {
    /// Validates and stores the two percentages.
    ///
    /// # Errors
    ///
    /// [`AmmError::InvalidFee`] if either exceeds [`MAX_PROTOCOL_FEE`].
    pub fn new(swap: FixedPoint, yield_: FixedPoint) -> Result<Self> {
        if swap > MAX_PROTOCOL_FEE {
            return Err(AmmError::InvalidFee("protocol swap fee above 50%"));
        }
        if yield_ > MAX_PROTOCOL_FEE {
            return Err(AmmError::InvalidFee("protocol yield fee above 50%"));
        }
        Ok(Self { swap, yield_ })
    }

    /// Cut of swap-fee growth.
    #[must_use]
    pub const fn swap(&self) -> FixedPoint {
        self.swap
    }

    /// Cut of non-exempt yield growth.
    #[must_use]
    pub const fn yield_(&self) -> FixedPoint {
        self.yield_
    }
}

/// The three invariant measurements described in the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthInvariants {
    /// Invariant with all balances at old rates.
    pub swap_fee_growth: FixedPoint,
    /// Invariant with only exempt balances at old rates.
    pub total_non_exempt_growth: FixedPoint,
    /// Invariant with all balances at current rates.
    pub total_growth: FixedPoint,
}

/// Fraction of the pool the protocol is owed for growth since
/// `last_invariant`.
///
/// Each growth delta clamps at zero, so a shrinking pool (or one whose
/// rates fell) owes nothing rather than producing a negative fee.
pub fn pool_ownership_percentage(
    growth: &GrowthInvariants,
    last_invariant: FixedPoint,
    percentages: &ProtocolFeePercentages,
) -> Result<FixedPoint> {
    let swap_fee_delta = growth.swap_fee_growth.sub_or_zero(last_invariant);
    let yield_delta = growth
        .total_non_exempt_growth
        .sub_or_zero(growth.swap_fee_growth);

    let swap_ownership = swap_fee_delta
        .div_down(growth.total_growth)?
        .mul_down(percentages.swap())?;
    let yield_ownership = yield_delta
        .div_down(growth.total_growth)?
        .mul_down(percentages.yield_())?;
    swap_ownership.add(yield_ownership)
}

/// Shares to mint so the protocol ends up owning `ownership` of the
/// pool.
///
/// Minting dilutes the mint itself, hence the gross-up:
/// `minted / (supply + minted) = ownership` solves to
/// `minted = supply * ownership / (1 - ownership)`.
pub fn shares_for_pool_ownership(
    virtual_supply: FixedPoint,
    ownership: FixedPoint,
) -> Result<FixedPoint> {
    if ownership.is_zero() {
        return Ok(FixedPoint::ZERO);
    }
    virtual_supply
        .mul_down(ownership)?
        .div_down(ownership.complement())
}
