//! Bookkeeping that sits beside the pool math: share supply, cached
//! pricing rates, and the protocol's cut of pool growth.

mod protocol_fees;
mod rate_cache;
mod supply;

pub use protocol_fees::{
    pool_ownership_percentage, shares_for_pool_ownership, GrowthInvariants,
    ProtocolFeePercentages, MAX_PROTOCOL_FEE,
};
pub use rate_cache::RateCache;
pub use supply::{InitMint, SupplyLedger, MINIMUM_SHARES, PREMINTED_SHARES};
