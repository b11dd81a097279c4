//! Iterative math for stable pools (low-slippage curves for pegged
//! assets).
//!
//! The stable curve interpolates between a constant-sum and a
//! constant-product invariant, weighted by the amplification
//! coefficient `A`:
//!
//! ```text
//! A * n^n * S + D = A * D * n^n + D^(n+1) / (n^n * prod_i b_i)
//! ```
//!
//! `D` has no closed form, so [`calculate_invariant`] runs a
//! Newton-style iteration, as does the companion solver
//! [`get_token_balance_given_invariant_and_all_other_balances`] that
//! answers "what must this one balance be for the pool to sit exactly
//! on invariant `D`". Both converge to within one wei in a handful of
//! rounds for any well-formed pool; a hard 255-round budget turns a
//! non-converging input into [`AmmError::InvariantDidNotConverge`]
//! rather than a stall.
//!
//! Amplification values passed here are pre-scaled by
//! [`AMP_PRECISION`] so ramping between integer amp values stays
//! smooth.

use primitive_types::U256;

use crate::error::{AmmError, Result};
use crate::math::FixedPoint;

/// Most tokens a stable pool can hold (excluding its own share token).
pub const MAX_TOKENS: usize = 5;

/// Scale factor applied to amplification values.
pub const AMP_PRECISION: u64 = 1_000;

/// Iteration budget shared by both solvers.
const MAX_ITERATIONS: usize = 255;

const ONE: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Ceiling division on raw values.
fn div_up(numerator: U256, denominator: U256) -> Result<U256> {
    if denominator.is_zero() {
        return Err(AmmError::DivisionByZero);
    }
    if numerator.is_zero() {
        Ok(U256::zero())
    } else {
        Ok((numerator - U256::one()) / denominator + U256::one())
    }
}

// -- invariant ---------------------------------------------------------------

/// Computes the stable invariant `D` for the given pre-scaled
/// amplification and balances.
///
/// Returns zero for an empty pool. Convergence is declared when two
/// successive estimates differ by at most one wei.
///
/// # Errors
///
/// [`AmmError::InvariantDidNotConverge`] if 255 rounds pass without
/// the estimates settling.
pub fn calculate_invariant(amplification: u64, balances: &[FixedPoint]) -> Result<FixedPoint> {
    let n = U256::from(balances.len());
    let mut sum = U256::zero();
    for balance in balances {
        sum = sum
            .checked_add(balance.as_u256())
            .ok_or(AmmError::Overflow("stable invariant balance sum"))?;
    }
    if sum.is_zero() {
        return Ok(FixedPoint::ZERO);
    }

    let amp_times_total = U256::from(amplification) * n;
    let amp_precision = U256::from(AMP_PRECISION);

    let mut invariant = sum;
    for _ in 0..MAX_ITERATIONS {
        // D_P = D^(n+1) / (n^n * prod b_i), folded one factor at a time
        // to keep intermediates inside the word.
        let mut d_p = invariant;
        for balance in balances {
            let denominator = balance
                .as_u256()
                .checked_mul(n)
                .ok_or(AmmError::Overflow("stable invariant product"))?;
            if denominator.is_zero() {
                return Err(AmmError::InvalidQuantity("zero balance in stable pool"));
            }
            d_p = d_p
                .checked_mul(invariant)
                .ok_or(AmmError::Overflow("stable invariant product"))?
                / denominator;
        }

        let previous = invariant;
        let numerator = (amp_times_total * sum / amp_precision
            + d_p * n)
            .checked_mul(invariant)
            .ok_or(AmmError::Overflow("stable invariant numerator"))?;
        let denominator =
            (amp_times_total - amp_precision) * invariant / amp_precision + (n + U256::one()) * d_p;
        invariant = numerator / denominator;

        let diff = if invariant > previous {
            invariant - previous
        } else {
            previous - invariant
        };
        if diff <= U256::one() {
            return Ok(FixedPoint::from_raw(invariant));
        }
    }
    Err(AmmError::InvariantDidNotConverge)
}

/// Solves for the single balance at `token_index` that puts the pool
/// exactly on `invariant`, holding every other balance fixed.
///
/// This is the workhorse behind stable swaps and single-token
/// joins/exits: perturb the known balances, re-solve for the unknown
/// one, and the difference is the trade. The result rounds up, so the
/// caller's subtraction rounds against the counterparty.
///
/// # Errors
///
/// [`AmmError::InvariantDidNotConverge`] if 255 rounds pass without
/// the estimates settling.
pub fn get_token_balance_given_invariant_and_all_other_balances(
    amplification: u64,
    balances: &[FixedPoint],
    invariant: FixedPoint,
    token_index: usize,
) -> Result<FixedPoint> {
    if token_index >= balances.len() {
        return Err(AmmError::InvalidToken("token index out of range"));
    }
    if invariant.is_zero() {
        return Err(AmmError::InvalidQuantity("zero target invariant"));
    }
    let n = U256::from(balances.len());
    let amp_times_total = U256::from(amplification) * n;
    let amp_precision = U256::from(AMP_PRECISION);
    let d = invariant.as_u256();

    // P_D tracks n^n * prod b_j / D^(n-1); folding through D keeps the
    // running product near D's own magnitude.
    let mut sum = balances[0].as_u256();
    let mut p_d = balances[0]
        .as_u256()
        .checked_mul(n)
        .ok_or(AmmError::Overflow("stable solver product"))?;
    for balance in &balances[1..] {
        p_d = p_d
            .checked_mul(balance.as_u256())
            .ok_or(AmmError::Overflow("stable solver product"))?
            .checked_mul(n)
            .ok_or(AmmError::Overflow("stable solver product"))?
            / d;
        sum += balance.as_u256();
    }
    sum -= balances[token_index].as_u256();

    let d_squared = d
        .checked_mul(d)
        .ok_or(AmmError::Overflow("stable solver invariant square"))?;

    // Quadratic coefficients of the single-balance equation
    // x^2 + (b - D) x = c, iterated as x <- (x^2 + c) / (2x + b - D).
    let c = div_up(d_squared, amp_times_total * p_d)?
        .checked_mul(amp_precision)
        .and_then(|scaled| scaled.checked_mul(balances[token_index].as_u256()))
        .ok_or(AmmError::Overflow("stable solver coefficient"))?;
    let b = sum + d / amp_times_total * amp_precision;

    let mut token_balance = div_up(d_squared + c, d + b)?;
    for _ in 0..MAX_ITERATIONS {
        let previous = token_balance;
        let numerator = token_balance
            .checked_mul(token_balance)
            .ok_or(AmmError::Overflow("stable solver iteration"))?
            .checked_add(c)
            .ok_or(AmmError::Overflow("stable solver iteration"))?;
        let denominator = (token_balance * U256::from(2u8) + b)
            .checked_sub(d)
            .ok_or(AmmError::Underflow("stable solver denominator"))?;
        token_balance = div_up(numerator, denominator)?;

        let diff = if token_balance > previous {
            token_balance - previous
        } else {
            previous - token_balance
        };
        if diff <= U256::one() {
            return Ok(FixedPoint::from_raw(token_balance));
        }
    }
    Err(AmmError::InvariantDidNotConverge)
}

// -- swaps -------------------------------------------------------------------

/// Amount of `token_out` paid for an exact `amount_in` of `token_in`,
/// holding the pool on `invariant`.
///
/// One extra wei is withheld so iteration error never favors the
/// trader.
pub fn calc_out_given_in(
    amplification: u64,
    balances: &[FixedPoint],
    token_in: usize,
    token_out: usize,
    amount_in: FixedPoint,
    invariant: FixedPoint,
) -> Result<FixedPoint> {
    let mut shifted: Vec<FixedPoint> = balances.to_vec();
    shifted[token_in] = shifted[token_in].add(amount_in)?;

    let final_out = get_token_balance_given_invariant_and_all_other_balances(
        amplification,
        &shifted,
        invariant,
        token_out,
    )?;
    balances[token_out]
        .sub(final_out)?
        .sub(FixedPoint::WEI)
        .map_err(|_| AmmError::SwapLimitExceeded("amount in buys no output"))
}

/// Amount of `token_in` required to withdraw an exact `amount_out` of
/// `token_out`, holding the pool on `invariant`.
///
/// One extra wei is charged so iteration error never favors the
/// trader.
pub fn calc_in_given_out(
    amplification: u64,
    balances: &[FixedPoint],
    token_in: usize,
    token_out: usize,
    amount_out: FixedPoint,
    invariant: FixedPoint,
) -> Result<FixedPoint> {
    let mut shifted: Vec<FixedPoint> = balances.to_vec();
    shifted[token_out] = shifted[token_out]
        .sub(amount_out)
        .map_err(|_| AmmError::SwapLimitExceeded("amount out exceeds balance"))?;

    let final_in = get_token_balance_given_invariant_and_all_other_balances(
        amplification,
        &shifted,
        invariant,
        token_in,
    )?;
    final_in.sub(balances[token_in])?.add(FixedPoint::WEI)
}

// -- joins -------------------------------------------------------------------

/// Pool shares minted for an exact basket of amounts in.
///
/// The taxable split uses each token's current balance share of the
/// pool as its effective weight; amounts beyond the aggregate deposit
/// ratio pay the swap fee.
pub fn calc_shares_out_given_exact_tokens_in(
    amplification: u64,
    balances: &[FixedPoint],
    amounts_in: &[FixedPoint],
    total_shares: FixedPoint,
    current_invariant: FixedPoint,
    swap_fee: FixedPoint,
) -> Result<FixedPoint> {
    debug_assert_eq!(balances.len(), amounts_in.len());

    let mut sum = FixedPoint::ZERO;
    for &balance in balances {
        sum = sum.add(balance)?;
    }

    let mut ratios_with_fee = [FixedPoint::ZERO; MAX_TOKENS];
    let mut invariant_ratio_with_fees = FixedPoint::ZERO;
    for i in 0..balances.len() {
        let weight = balances[i].div_down(sum)?;
        ratios_with_fee[i] = balances[i].add(amounts_in[i])?.div_down(balances[i])?;
        invariant_ratio_with_fees =
            invariant_ratio_with_fees.add(ratios_with_fee[i].mul_down(weight)?)?;
    }

    let mut new_balances = [FixedPoint::ZERO; MAX_TOKENS];
    for i in 0..balances.len() {
        let amount_in_without_fee = if ratios_with_fee[i] > invariant_ratio_with_fees {
            let non_taxable = balances[i]
                .mul_down(invariant_ratio_with_fees.sub_or_zero(FixedPoint::ONE))?;
            let taxable = amounts_in[i].sub_or_zero(non_taxable);
            non_taxable.add(taxable.mul_down(swap_fee.complement())?)?
        } else {
            amounts_in[i]
        };
        new_balances[i] = balances[i].add(amount_in_without_fee)?;
    }

    let new_invariant = calculate_invariant(amplification, &new_balances[..balances.len()])?;
    let invariant_ratio = new_invariant.div_down(current_invariant)?;
    if invariant_ratio > FixedPoint::ONE {
        total_shares.mul_down(invariant_ratio.sub(FixedPoint::ONE)?)
    } else {
        Ok(FixedPoint::ZERO)
    }
}

/// Amount of a single token required to mint an exact number of
/// shares.
pub fn calc_token_in_given_exact_shares_out(
    amplification: u64,
    balances: &[FixedPoint],
    token_index: usize,
    shares_out: FixedPoint,
    total_shares: FixedPoint,
    current_invariant: FixedPoint,
    swap_fee: FixedPoint,
) -> Result<FixedPoint> {
    let new_invariant = total_shares
        .add(shares_out)?
        .div_up(total_shares)?
        .mul_up(current_invariant)?;

    let new_balance = get_token_balance_given_invariant_and_all_other_balances(
        amplification,
        balances,
        new_invariant,
        token_index,
    )?;
    let amount_in_without_fee = new_balance.sub(balances[token_index])?;

    let mut sum = FixedPoint::ZERO;
    for &balance in balances {
        sum = sum.add(balance)?;
    }
    let taxable_percentage = balances[token_index].div_down(sum)?.complement();
    let taxable = amount_in_without_fee.mul_up(taxable_percentage)?;
    let non_taxable = amount_in_without_fee.sub(taxable)?;
    non_taxable.add(taxable.div_up(swap_fee.complement())?)
}

// -- exits -------------------------------------------------------------------

/// Pool shares burned for an exact basket of amounts out.
pub fn calc_shares_in_given_exact_tokens_out(
    amplification: u64,
    balances: &[FixedPoint],
    amounts_out: &[FixedPoint],
    total_shares: FixedPoint,
    current_invariant: FixedPoint,
    swap_fee: FixedPoint,
) -> Result<FixedPoint> {
    debug_assert_eq!(balances.len(), amounts_out.len());

    let mut sum = FixedPoint::ZERO;
    for &balance in balances {
        sum = sum.add(balance)?;
    }

    let mut ratios_without_fee = [FixedPoint::ZERO; MAX_TOKENS];
    let mut invariant_ratio_without_fees = FixedPoint::ZERO;
    for i in 0..balances.len() {
        let weight = balances[i].div_up(sum)?;
        ratios_without_fee[i] = balances[i].sub(amounts_out[i])?.div_up(balances[i])?;
        invariant_ratio_without_fees =
            invariant_ratio_without_fees.add(ratios_without_fee[i].mul_up(weight)?)?;
    }

    let mut new_balances = [FixedPoint::ZERO; MAX_TOKENS];
    for i in 0..balances.len() {
        let amount_out_with_fee = if invariant_ratio_without_fees > ratios_without_fee[i] {
            let non_taxable = balances[i].mul_down(invariant_ratio_without_fees.complement())?;
            let taxable = amounts_out[i].sub_or_zero(non_taxable);
            non_taxable.add(taxable.div_up(swap_fee.complement())?)?
        } else {
            amounts_out[i]
        };
        new_balances[i] = balances[i].sub(amount_out_with_fee)?;
    }

    let new_invariant = calculate_invariant(amplification, &new_balances[..balances.len()])?;
    let invariant_ratio = new_invariant.div_down(current_invariant)?;
    total_shares.mul_up(invariant_ratio.complement())
}

/// Amount of a single token paid out for burning an exact number of
/// shares.
pub fn calc_token_out_given_exact_shares_in(
    amplification: u64,
    balances: &[FixedPoint],
    token_index: usize,
    shares_in: FixedPoint,
    total_shares: FixedPoint,
    current_invariant: FixedPoint,
    swap_fee: FixedPoint,
) -> Result<FixedPoint> {
    let new_invariant = total_shares
        .sub(shares_in)?
        .div_up(total_shares)?
        .mul_up(current_invariant)?;

    let new_balance = get_token_balance_given_invariant_and_all_other_balances(
        amplification,
        balances,
        new_invariant,
        token_index,
    )?;
    let amount_out_without_fee = balances[token_index].sub(new_balance)?;

    let mut sum = FixedPoint::ZERO;
    for &balance in balances {
        sum = sum.add(balance)?;
    }
    let taxable_percentage = balances[token_index].div_down(sum)?.complement();
    let taxable = amount_out_without_fee.mul_up(taxable_percentage)?;
    let non_taxable = amount_out_without_fee.sub(taxable)?;
    non_taxable.add(taxable.mul_down(swap_fee.complement())?)
}

/// Amounts of every token required to mint an exact number of shares
/// proportionally (no fee, no price impact).
pub fn calc_all_tokens_in_given_exact_shares_out(
    balances: &[FixedPoint],
    shares_out: FixedPoint,
    total_shares: FixedPoint,
) -> Result<Vec<FixedPoint>> {
    let ratio = shares_out.div_up(total_shares)?;
    balances.iter().map(|balance| balance.mul_up(ratio)).collect()
}

/// Amounts of every token paid out for burning an exact number of
/// shares proportionally (no fee, no price impact).
pub fn calc_tokens_out_given_exact_shares_in(
    balances: &[FixedPoint],
    shares_in: FixedPoint,
    total_shares: FixedPoint,
) -> Result<Vec<FixedPoint>> {
    let ratio = shares_in.div_down(total_shares)?;
    balances.iter().map(|balance| balance.mul_down(ratio)).collect()
}
