//! Swap request descriptions.

use crate::error::{AmmError, Result};
use crate::math::FixedPoint;

/// A single-pair swap, quoted from either side.
///
/// Token positions are indices into the pool's token list. Constructed
/// through [`given_in`](Self::given_in) / [`given_out`](Self::given_out)
/// so an instance always describes a well-formed trade: distinct
/// tokens, non-zero amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapRequest {
    /// The trader fixes the input amount; the pool computes the output.
    GivenIn {
        token_in: usize,
        token_out: usize,
        amount_in: FixedPoint,
    },
    /// The trader fixes the output amount; the pool computes the input.
    GivenOut {
        token_in: usize,
        token_out: usize,
        amount_out: FixedPoint,
    },
}

impl SwapRequest {
    /// Describes a swap of an exact `amount_in` of `token_in`.
    ///
    /// # Errors
    ///
    /// [`AmmError::InvalidToken`] for identical token indices,
    /// [`AmmError::InvalidQuantity`] for a zero amount.
    pub fn given_in(token_in: usize, token_out: usize, amount_in: FixedPoint) -> Result<Self> {
        Self::validate(token_in, token_out, amount_in)?;
        Ok(Self::GivenIn {
            token_in,
            token_out,
            amount_in,
        })
    }

    /// Describes a swap for an exact `amount_out` of `token_out`.
    ///
    /// # Errors
    ///
    /// [`AmmError::InvalidToken`] for identical token indices,
    /// [`AmmError::InvalidQuantity`] for a zero amount.
    pub fn given_out(token_in: usize, token_out: usize, amount_out: FixedPoint) -> Result<Self> {
        Self::validate(token_in, token_out, amount_out)?;
        Ok(Self::GivenOut {
            token_in,
            token_out,
            amount_out,
        })
    }

    fn validate(token_in: usize, token_out: usize, amount: FixedPoint) -> Result<()> {
        if token_in == token_out {
            return Err(AmmError::InvalidToken("swap between identical tokens"));
        }
        if amount.is_zero() {
            return Err(AmmError::InvalidQuantity("zero swap amount"));
        }
        Ok(())
    }

    /// Index of the token entering the pool.
    #[must_use]
    pub const fn token_in(&self) -> usize {
        match self {
            Self::GivenIn { token_in, .. } | Self::GivenOut { token_in, .. } => *token_in,
        }
    }

    /// Index of the token leaving the pool.
    #[must_use]
    pub const fn token_out(&self) -> usize {
        match self {
            Self::GivenIn { token_out, .. } | Self::GivenOut { token_out, .. } => *token_out,
        }
    }
}
