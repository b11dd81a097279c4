//! Convenience re-exports for typical use of the crate.
//!
//! ```
//! use basin_amm::prelude::*;
//! ```

pub use crate::accounting::{ProtocolFeePercentages, RateCache, SupplyLedger};
pub use crate::amplification::AmplificationParameter;
pub use crate::domain::{
    ExitRequest, JoinExitResult, JoinRequest, Rounding, SwapRequest, Token, TokenAddress,
};
pub use crate::error::{AmmError, Result};
pub use crate::math::FixedPoint;
pub use crate::pools::{
    StablePool, StablePoolParams, StableTokenParams, WeightedPool, WeightedPoolParams,
};
pub use crate::traits::{
    ConstantFeePolicy, ConstantRateProvider, FeeTokenPolicy, HighestWeightPolicy,
    ProtocolFeePolicy, RateProvider,
};
