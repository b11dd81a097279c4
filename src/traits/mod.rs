//! Extension seams: implement these traits to plug external behavior
//! into a pool without touching its math.

mod fee_policy;
mod protocol_fee_policy;
mod rate_provider;

pub use fee_policy::{FeeTokenPolicy, HighestWeightPolicy};
pub use protocol_fee_policy::{ConstantFeePolicy, ProtocolFeePolicy};
pub use rate_provider::{ConstantRateProvider, RateProvider};
