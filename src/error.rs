//! Unified error types for the Basin AMM engine.
//!
//! All fallible operations across the crate return [`AmmError`] as their
//! error type, ensuring a consistent error handling experience for consumers.
//!
//! # Taxonomy
//!
//! | Class | Variants | Retriable |
//! |-------|----------|-----------|
//! | Input validation | `InvalidConfiguration`, `InvalidToken`, `InvalidQuantity`, `InvalidWeight`, `InvalidFee` | with fixed inputs |
//! | Numeric bounds | `SwapLimitExceeded`, `InvariantRatioOutOfBounds`, `InvalidAmplification`, `Overflow`, `Underflow`, `DivisionByZero` | with smaller inputs |
//! | Convergence | `InvariantDidNotConverge` | only with changed inputs |
//! | External dependency | `RateProviderFailure` | once the provider recovers |
//! | Re-entrancy | `ReentrancyDetected` | after the outer call returns |
//!
//! Every failure is atomic: pool operations compute on snapshots and only
//! commit state after all fallible math has succeeded, so an `Err` never
//! leaves partial balance, supply, or cache mutations behind.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = core::result::Result<T, AmmError>;

/// Unified error enum for all engine operations.
///
/// Variants carry a `&'static str` payload describing the specific
/// condition, which keeps the enum `Copy` and allocation-free.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AmmError {
    /// A pool or request was constructed with inconsistent parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// A token index does not refer to a token in the pool.
    #[error("invalid token: {0}")]
    InvalidToken(&'static str),

    /// An amount failed validation (zero where non-zero is required, or
    /// too small to represent).
    #[error("invalid quantity: {0}")]
    InvalidQuantity(&'static str),

    /// A normalized weight is below the minimum or the weights do not
    /// sum to one.
    #[error("invalid weight: {0}")]
    InvalidWeight(&'static str),

    /// A fee percentage is outside its allowed range.
    #[error("invalid fee: {0}")]
    InvalidFee(&'static str),

    /// An amplification value or ramp violates its bounds.
    #[error("invalid amplification: {0}")]
    InvalidAmplification(&'static str),

    /// Checked arithmetic overflowed.
    #[error("arithmetic overflow: {0}")]
    Overflow(&'static str),

    /// Checked subtraction would produce a negative value.
    #[error("arithmetic underflow: {0}")]
    Underflow(&'static str),

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A swap amount exceeds the per-operation ratio cap or would
    /// exhaust a balance.
    #[error("swap limit exceeded: {0}")]
    SwapLimitExceeded(&'static str),

    /// A join or exit would grow the invariant above 3x or shrink it
    /// below 0.7x of its prior value.
    #[error("invariant ratio out of bounds: {0}")]
    InvariantRatioOutOfBounds(&'static str),

    /// The stable-curve solver exhausted its iteration budget.
    ///
    /// Deterministic: retrying with identical inputs fails identically.
    #[error("invariant computation did not converge within the iteration budget")]
    InvariantDidNotConverge,

    /// A rate provider call failed; the enclosing operation is aborted
    /// with no partial cache commit.
    #[error("rate provider failure: {0}")]
    RateProviderFailure(&'static str),

    /// A re-entrant call into a pool was rejected by its entry guard.
    #[error("reentrant call rejected")]
    ReentrancyDetected,
}
