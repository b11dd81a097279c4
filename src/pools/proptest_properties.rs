//! Property-based invariants over the pool math.
//!
//! These complement the example-based tests with randomized inputs:
//! rounding directions must hold for every operand, the stable solver
//! must converge across the whole supported amp and balance range, and
//! no swap may create value.

#![allow(clippy::panic)]

use proptest::prelude::*;

use crate::math::{stable, weighted, FixedPoint};

const ONE: u128 = 1_000_000_000_000_000_000;

fn fp(wei: u128) -> FixedPoint {
    FixedPoint::from_wei(wei)
}

/// Balances from dust (10^6 wei) up to a billion whole tokens.
fn balance_strategy() -> impl Strategy<Value = FixedPoint> {
    (1_000_000u128..=ONE * 1_000_000_000).prop_map(fp)
}

/// Unscaled amplification over its full supported range.
fn amp_strategy() -> impl Strategy<Value = u64> {
    (1u64..=5_000).prop_map(|amp| amp * stable::AMP_PRECISION)
}

/// Stable-pool balances: nine orders of magnitude, bounded imbalance.
fn stable_balance_strategy() -> impl Strategy<Value = FixedPoint> {
    (ONE / 1_000..=ONE * 1_000_000).prop_map(fp)
}

/// Weight pairs (w, 1 - w) with both sides above the minimum.
fn weight_pair_strategy() -> impl Strategy<Value = (FixedPoint, FixedPoint)> {
    (ONE / 100..=99 * ONE / 100).prop_map(|w| (fp(w), fp(ONE - w)))
}

proptest! {
    #[test]
    fn mul_rounding_directions_bracket(a in balance_strategy(), b in balance_strategy()) {
        let Ok(down) = a.mul_down(b) else { panic!("expected Ok") };
        let Ok(up) = a.mul_up(b) else { panic!("expected Ok") };
        prop_assert!(down <= up);
        prop_assert!(up.as_u256() - down.as_u256() <= primitive_types::U256::one());
    }

    #[test]
    fn div_then_mul_never_gains(a in balance_strategy(), b in balance_strategy()) {
        let Ok(quotient) = a.div_down(b) else { panic!("expected Ok") };
        let Ok(back) = quotient.mul_down(b) else { panic!("expected Ok") };
        prop_assert!(back <= a);
    }

    #[test]
    fn pow_directions_bracket(
        base in (ONE / 10..=10 * ONE).prop_map(fp),
        exponent in (ONE / 10..=4 * ONE).prop_map(fp),
    ) {
        let Ok(down) = base.pow_down(exponent) else { panic!("expected Ok") };
        let Ok(up) = base.pow_up(exponent) else { panic!("expected Ok") };
        prop_assert!(down <= up);
    }

    #[test]
    fn weighted_swap_output_bounded(
        balance_in in balance_strategy(),
        balance_out in balance_strategy(),
        (weight_in, weight_out) in weight_pair_strategy(),
        in_permille in 1u128..=300,
    ) {
        let Ok(amount_in) = balance_in.mul_down(fp(in_permille * ONE / 1_000)) else {
            panic!("expected Ok")
        };
        prop_assume!(!amount_in.is_zero());
        let Ok(out) = weighted::calc_out_given_in(
            balance_in, weight_in, balance_out, weight_out, amount_in,
        ) else {
            // tiny weight ratios can push the power past its exponent cap
            return Ok(());
        };
        // the pool can never pay out more than it holds
        prop_assert!(out < balance_out);
    }

    #[test]
    fn weighted_swap_monotone_in_input(
        balance_in in balance_strategy(),
        balance_out in balance_strategy(),
        (weight_in, weight_out) in weight_pair_strategy(),
    ) {
        let Ok(small) = balance_in.mul_down(fp(ONE / 10)) else { panic!("expected Ok") };
        let Ok(large) = balance_in.mul_down(fp(2 * ONE / 10)) else { panic!("expected Ok") };
        prop_assume!(!small.is_zero());
        let small_out = weighted::calc_out_given_in(
            balance_in, weight_in, balance_out, weight_out, small,
        );
        let large_out = weighted::calc_out_given_in(
            balance_in, weight_in, balance_out, weight_out, large,
        );
        if let (Ok(small_out), Ok(large_out)) = (small_out, large_out) {
            prop_assert!(small_out <= large_out);
        }
    }

    #[test]
    fn weighted_invariant_strictly_increases_with_any_balance(
        a in balance_strategy(),
        b in balance_strategy(),
        (weight_a, weight_b) in weight_pair_strategy(),
        bump_permille in 10u128..=500,
    ) {
        let weights = [weight_a, weight_b];
        let Ok(before) = weighted::calculate_invariant(&weights, &[a, b]) else {
            panic!("expected Ok")
        };
        let Ok(bump) = a.mul_up(fp(bump_permille * ONE / 1_000)) else {
            panic!("expected Ok")
        };
        let Ok(bumped) = a.add(bump) else { panic!("expected Ok") };
        let Ok(after) = weighted::calculate_invariant(&weights, &[bumped, b]) else {
            panic!("expected Ok")
        };
        // growing one balance by at least 1% must grow the invariant,
        // rounding noise notwithstanding
        prop_assert!(after > before, "before {before} after {after}");
    }

    #[test]
    fn stable_invariant_converges_and_is_bounded(
        amp in amp_strategy(),
        a in stable_balance_strategy(),
        b in stable_balance_strategy(),
        c in stable_balance_strategy(),
    ) {
        let balances = [a, b, c];
        let Ok(invariant) = stable::calculate_invariant(amp, &balances) else {
            panic!("no convergence")
        };
        let Ok(sum) = a.add(b).and_then(|ab| ab.add(c)) else { panic!("expected Ok") };
        let Ok(bound) = sum.add(FixedPoint::from_wei(2)) else { panic!("expected Ok") };
        prop_assert!(!invariant.is_zero());
        // the stable invariant never exceeds the constant-sum value
        prop_assert!(invariant <= bound);
    }

    #[test]
    fn stable_solver_agrees_with_invariant(
        amp in amp_strategy(),
        a in stable_balance_strategy(),
        b in stable_balance_strategy(),
    ) {
        let balances = [a, b];
        let Ok(invariant) = stable::calculate_invariant(amp, &balances) else {
            panic!("no convergence")
        };
        let Ok(solved) = stable::get_token_balance_given_invariant_and_all_other_balances(
            amp, &balances, invariant, 1,
        ) else {
            panic!("no convergence")
        };
        // solving for a balance the pool already has must return it,
        // up to iteration tolerance
        let tolerance = b.as_u256() / 1_000_000u64 + primitive_types::U256::from(10u8);
        let diff = if solved > b {
            solved.as_u256() - b.as_u256()
        } else {
            b.as_u256() - solved.as_u256()
        };
        prop_assert!(diff <= tolerance, "solved {solved} for balance {b}");
    }

    #[test]
    fn stable_swap_round_trip_never_profits(
        amp in amp_strategy(),
        a in stable_balance_strategy(),
        b in stable_balance_strategy(),
        in_permille in 1u128..=200,
    ) {
        let balances = [a, b];
        let Ok(invariant) = stable::calculate_invariant(amp, &balances) else {
            panic!("no convergence")
        };
        let Ok(amount_in) = a.mul_down(fp(in_permille * ONE / 1_000)) else {
            panic!("expected Ok")
        };
        prop_assume!(!amount_in.is_zero());

        let Ok(out) = stable::calc_out_given_in(amp, &balances, 0, 1, amount_in, invariant) else {
            // extreme imbalance can make the trade infeasible
            return Ok(());
        };
        prop_assert!(out < b);
        let Ok(back) = stable::calc_in_given_out(amp, &balances, 0, 1, out, invariant) else {
            return Ok(());
        };
        // quoting the exact output back can never cost less input
        prop_assert!(back >= amount_in.sub_or_zero(fp(1_000)));
    }
}
