//! Selection of the token in which weighted pools pay protocol fees.

use core::fmt;

use crate::math::FixedPoint;

/// Chooses which pool token settles accrued protocol swap fees.
///
/// The choice must be deterministic for a given weight vector; basing
/// it on anything resembling randomness lets the caller steer fees
/// into whichever token suits them.
pub trait FeeTokenPolicy: fmt::Debug {
    /// Returns the index of the fee token for a pool with the given
    /// normalized weights. The slice is never empty.
    fn select_fee_token(&self, weights: &[FixedPoint]) -> usize;
}

/// Pays fees in the token with the highest normalized weight, breaking
/// ties towards the lowest index.
///
/// The highest-weight token is the one whose balance moves least for a
/// given invariant change, so charging the fee there disturbs the
/// pool's prices the least.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighestWeightPolicy;

impl FeeTokenPolicy for HighestWeightPolicy {
    fn select_fee_token(&self, weights: &[FixedPoint]) -> usize {
        let mut best = 0;
        for (index, &weight) in weights.iter().enumerate().skip(1) {
            if weight > weights[best] {
                best = index;
            }
        }
        best
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn fp(wei: u128) -> FixedPoint {
        FixedPoint::from_wei(wei)
    }

    #[test]
    fn picks_highest_weight() {
        let weights = [fp(2), fp(5), fp(3)];
        assert_eq!(HighestWeightPolicy.select_fee_token(&weights), 1);
    }

    #[test]
    fn ties_break_towards_lowest_index() {
        let weights = [fp(5), fp(5), fp(3)];
        assert_eq!(HighestWeightPolicy.select_fee_token(&weights), 0);
    }
}
