//! # basin-amm
//!
//! A constant-function market-maker engine: deterministic fixed-point
//! math for weighted and stable liquidity pools, including swap
//! pricing, share accounting, and the protocol's cut of pool growth.
//!
//! All arithmetic is 18-decimal fixed point over 256-bit integers with
//! explicit rounding directions, so every result is reproducible to
//! the wei and every rounding favors the pool.
//!
//! ## Architecture
//!
//! ```text
//!                 +---------------------------+
//!                 |          pools            |
//!                 |  WeightedPool StablePool  |
//!                 +------+-------------+------+
//!                        |             |
//!          +-------------+--+       +--+--------------------+
//!          |     math       |       |      accounting       |
//!          | weighted stable|       | supply fees rate_cache|
//!          | fixed_point    |       +--+--------------------+
//!          +-------------+--+          |
//!                        |             |
//!                 +------+-------------+------+
//!                 |  domain   traits   error  |
//!                 +---------------------------+
//! ```
//!
//! ## Module guide
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`math`] | [`FixedPoint`](math::FixedPoint), weighted closed forms, stable iterative solvers |
//! | [`pools`] | [`WeightedPool`](pools::WeightedPool), [`StablePool`](pools::StablePool), re-entrancy guard |
//! | [`accounting`] | Share supply ledger, protocol fee split, rate caches |
//! | [`amplification`] | Ramped amplification parameter for stable pools |
//! | [`domain`] | Tokens, swap/join/exit request types, rounding direction |
//! | [`traits`] | [`RateProvider`](traits::RateProvider), [`FeeTokenPolicy`](traits::FeeTokenPolicy), [`ProtocolFeePolicy`](traits::ProtocolFeePolicy) |
//! | [`error`] | [`AmmError`](error::AmmError) and the crate [`Result`](error::Result) |
//!
//! ## Example
//!
//! ```
//! use basin_amm::prelude::*;
//!
//! # fn main() -> basin_amm::error::Result<()> {
//! let tokens = vec![
//!     Token::new(TokenAddress::from_seed(1), 18)?,
//!     Token::new(TokenAddress::from_seed(2), 18)?,
//! ];
//! let weights = vec![
//!     FixedPoint::from_wei(800_000_000_000_000_000),
//!     FixedPoint::from_wei(200_000_000_000_000_000),
//! ];
//! let swap_fee = FixedPoint::from_wei(10_000_000_000_000_000); // 1%
//!
//! let mut pool = WeightedPool::new(WeightedPoolParams::basic(tokens, weights, swap_fee))?;
//! pool.join(JoinRequest::Init {
//!     amounts: vec![FixedPoint::from_integer(1000), FixedPoint::from_integer(200)],
//! })?;
//!
//! let quote = pool.swap(SwapRequest::given_in(0, 1, FixedPoint::from_integer(100))?)?;
//! assert!(quote < FixedPoint::from_integer(100));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod accounting;
pub mod amplification;
pub mod domain;
pub mod error;
pub mod math;
pub mod pools;
pub mod prelude;
pub mod traits;
