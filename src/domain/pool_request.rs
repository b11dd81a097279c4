//! Join and exit request descriptions plus their shared result type.

use crate::error::{AmmError, Result};
use crate::math::FixedPoint;

/// A request to add liquidity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinRequest {
    /// First-ever join: seeds the pool balances and locks the minimum
    /// share amount forever.
    Init { amounts: Vec<FixedPoint> },
    /// Deposit an exact basket of token amounts; shares minted are
    /// whatever the deposit is worth after fees.
    ExactTokensIn { amounts: Vec<FixedPoint> },
    /// Deposit a single token sized so that exactly `shares_out`
    /// shares are minted.
    TokenInForExactShares {
        token_index: usize,
        shares_out: FixedPoint,
    },
    /// Deposit a proportional slice of every balance so that exactly
    /// `shares_out` shares are minted. Fee-free.
    ProportionalSharesOut { shares_out: FixedPoint },
}

impl JoinRequest {
    pub(crate) fn validate(&self, token_count: usize) -> Result<()> {
        match self {
            Self::Init { amounts } | Self::ExactTokensIn { amounts } => {
                if amounts.len() != token_count {
                    return Err(AmmError::InvalidConfiguration("amounts length mismatch"));
                }
                Ok(())
            }
            Self::TokenInForExactShares {
                token_index,
                shares_out,
            } => {
                if *token_index >= token_count {
                    return Err(AmmError::InvalidToken("join token index out of range"));
                }
                if shares_out.is_zero() {
                    return Err(AmmError::InvalidQuantity("zero shares requested"));
                }
                Ok(())
            }
            Self::ProportionalSharesOut { shares_out } => {
                if shares_out.is_zero() {
                    return Err(AmmError::InvalidQuantity("zero shares requested"));
                }
                Ok(())
            }
        }
    }
}

/// A request to remove liquidity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitRequest {
    /// Withdraw an exact basket of token amounts; shares burned are
    /// whatever the withdrawal costs after fees.
    ExactTokensOut { amounts: Vec<FixedPoint> },
    /// Burn exactly `shares_in` shares for a single token.
    ExactSharesInForToken {
        token_index: usize,
        shares_in: FixedPoint,
    },
    /// Burn exactly `shares_in` shares for a proportional slice of
    /// every balance. Fee-free and immune to invariant-ratio bounds.
    ProportionalSharesIn { shares_in: FixedPoint },
}

impl ExitRequest {
    pub(crate) fn validate(&self, token_count: usize) -> Result<()> {
        match self {
            Self::ExactTokensOut { amounts } => {
                if amounts.len() != token_count {
                    return Err(AmmError::InvalidConfiguration("amounts length mismatch"));
                }
                Ok(())
            }
            Self::ExactSharesInForToken {
                token_index,
                shares_in,
            } => {
                if *token_index >= token_count {
                    return Err(AmmError::InvalidToken("exit token index out of range"));
                }
                if shares_in.is_zero() {
                    return Err(AmmError::InvalidQuantity("zero shares offered"));
                }
                Ok(())
            }
            Self::ProportionalSharesIn { shares_in } => {
                if shares_in.is_zero() {
                    return Err(AmmError::InvalidQuantity("zero shares offered"));
                }
                Ok(())
            }
        }
    }
}

/// Outcome of a join or exit, reported only after every fallible step
/// succeeded and the pool state was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinExitResult {
    /// Shares minted (join) or burned (exit).
    pub share_delta: FixedPoint,
    /// Token amounts moved, indexed like the pool's token list. For a
    /// join these enter the pool; for an exit they leave it.
    pub amounts: Vec<FixedPoint>,
    /// Protocol fees settled as part of this operation, indexed like
    /// the pool's token list (weighted pools pay fees in tokens).
    pub protocol_fee_amounts: Vec<FixedPoint>,
    /// Shares minted to the protocol (stable pools pay fees by
    /// dilution instead of in tokens).
    pub protocol_shares_minted: FixedPoint,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn join_validates_amounts_length() {
        let request = JoinRequest::ExactTokensIn {
            amounts: vec![FixedPoint::ONE],
        };
        assert!(request.validate(2).is_err());
        assert!(request.validate(1).is_ok());
    }

    #[test]
    fn single_token_requests_validate_index_and_amount() {
        let bad_index = JoinRequest::TokenInForExactShares {
            token_index: 3,
            shares_out: FixedPoint::ONE,
        };
        assert!(matches!(
            bad_index.validate(2),
            Err(AmmError::InvalidToken(_))
        ));

        let zero = ExitRequest::ExactSharesInForToken {
            token_index: 0,
            shares_in: FixedPoint::ZERO,
        };
        assert!(matches!(
            zero.validate(2),
            Err(AmmError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn proportional_exit_needs_nonzero_shares() {
        let request = ExitRequest::ProportionalSharesIn {
            shares_in: FixedPoint::ZERO,
        };
        assert!(request.validate(2).is_err());
    }
}
