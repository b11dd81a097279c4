//! Natural logarithm and exponential kernel backing fixed-point `pow`.
//!
//! Operates on raw 10^18-scaled [`U256`] values. `x^y` is computed as
//! `exp(y * ln(x))`; the combined relative error of the kernel is below
//! 10^-14, which callers must absorb by widening the result (see
//! `MAX_POW_RELATIVE_ERROR` in [`fixed_point`](crate::math::fixed_point)).
//!
//! `ln` uses power-of-two range reduction into `[1, 2)` followed by the
//! atanh series `ln(m) = 2 * (z + z^3/3 + z^5/5 + ...)` with
//! `z = (m - 1) / (m + 1)`. `exp` splits the argument into known
//! integer factors `e^128, e^64, e^32, ..., e^1` and a fractional
//! remainder evaluated by Taylor series. All loops are bounded and all
//! arithmetic is checked against the U256 word size.

use primitive_types::U256;

use crate::error::{AmmError, Result};

/// 1.0 at 10^18 scale.
const ONE: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// ln(2) at 10^18 scale, rounded to nearest.
const LN2: U256 = U256([693_147_180_559_945_309, 0, 0, 0]);

/// Largest supported natural exponent, 130.0 at 10^18 scale.
///
/// e^130 * 10^18 is about 2.9 * 10^74, comfortably inside U256; the
/// next power-of-two factor would push intermediates past the word.
const MAX_NATURAL_EXPONENT: U256 = U256([872_791_484_033_138_688, 7, 0, 0]);

// Precomputed e^(2^k), k = 0..5, at 10^18 scale.
const E1: U256 = U256([2_718_281_828_459_045_235, 0, 0, 0]);
const E2: U256 = U256([7_389_056_098_930_650_227, 0, 0, 0]);
const E4: U256 = U256([17_704_661_885_725_135_846, 2, 0, 0]);
const E8: U256 = U256([11_032_191_174_490_464_567, 161, 0, 0]);
const E16: U256 = U256([305_552_728_560_958_351, 481_717, 0, 0]);
const E32: U256 = U256([8_110_818_508_622_829_156, 4_280_590_648_797, 0, 0]);

// e^64 and e^128 as plain integers (no 10^18 scale); at these
// magnitudes the fractional part is irrelevant and keeping them
// unscaled is what lets e^130 * 10^18 fit in the word.
const E64_INT: U256 = U256([17_696_838_799_656_736_180, 338_008_108, 0, 0]);
const E128_INT: U256 = U256([
    4_294_423_684_612_430_841,
    17_671_928_477_841_822_154,
    114_249_481_722_274_167,
    0,
]);

/// Computes `x^y` for raw 10^18-scaled `x > 0`, `y > 0`.
///
/// The result may deviate from the true value by up to 10^-14
/// relative in either direction; callers pick a side by widening.
///
/// # Errors
///
/// Returns [`AmmError::Overflow`] when `y * ln(x)` exceeds
/// [`MAX_NATURAL_EXPONENT`] in magnitude, or on intermediate overflow.
pub fn pow(x: U256, y: U256) -> Result<U256> {
    debug_assert!(!x.is_zero() && !y.is_zero());

    // ln(x) as (magnitude, sign); x < 1 gives a negative logarithm,
    // handled by inverting at the end so all internals stay unsigned.
    let (ln_magnitude, negative) = if x >= ONE {
        (ln(x)?, false)
    } else {
        let inverse = ONE
            .checked_mul(ONE)
            .and_then(|n| n.checked_div(x))
            .ok_or(AmmError::DivisionByZero)?;
        (ln(inverse)?, true)
    };

    let exponent = ln_magnitude
        .checked_mul(y)
        .ok_or(AmmError::Overflow("pow exponent"))?
        / ONE;
    if exponent > MAX_NATURAL_EXPONENT {
        return Err(AmmError::Overflow("pow exponent out of bounds"));
    }

    let grown = exp(exponent)?;
    if negative {
        // x^y = 1 / (1/x)^y
        Ok(ONE * ONE / grown)
    } else {
        Ok(grown)
    }
}

/// Natural logarithm of a raw 10^18-scaled `x >= 1`.
fn ln(x: U256) -> Result<U256> {
    debug_assert!(x >= ONE);

    // Halve into [1, 2), accumulating k * ln(2). x fits 256 bits so at
    // most 256 halvings; each loses under half a wei, which vanishes
    // against the magnitude being halved.
    let mut mantissa = x;
    let mut halvings = 0u32;
    while mantissa >= ONE * U256::from(2u8) {
        mantissa >>= 1;
        halvings += 1;
    }

    // atanh series: ln(m) = 2 * sum_{odd n} z^n / n, z = (m-1)/(m+1).
    // z <= 1/3 so 20 terms put truncation below 10^-19.
    let z = (mantissa - ONE) * ONE / (mantissa + ONE);
    let z_squared = z * z / ONE;
    let mut numerator = z;
    let mut sum = z;
    let mut n = U256::from(3u8);
    while n <= U256::from(39u8) {
        numerator = numerator * z_squared / ONE;
        sum += numerator / n;
        n += U256::from(2u8);
    }

    LN2.checked_mul(U256::from(halvings))
        .and_then(|reduced| reduced.checked_add(sum * U256::from(2u8)))
        .ok_or(AmmError::Overflow("ln accumulation"))
}

/// e^x for a raw 10^18-scaled `x <= MAX_NATURAL_EXPONENT`.
fn exp(x: U256) -> Result<U256> {
    debug_assert!(x <= MAX_NATURAL_EXPONENT);

    // Peel off the one big unscaled factor first. x <= 130 means at
    // most one of e^128 / e^64 applies, which keeps the final
    // multiplication inside the word.
    let mut remainder = x;
    let mut big_factor = U256::one();
    if remainder >= ONE * U256::from(128u8) {
        remainder -= ONE * U256::from(128u8);
        big_factor = E128_INT;
    } else if remainder >= ONE * U256::from(64u8) {
        remainder -= ONE * U256::from(64u8);
        big_factor = E64_INT;
    }

    // Scaled factors in descending order; each applies at most once.
    let mut product = ONE;
    for &(threshold, factor) in &[
        (32u8, E32),
        (16, E16),
        (8, E8),
        (4, E4),
        (2, E2),
        (1, E1),
    ] {
        let step = ONE * U256::from(threshold);
        if remainder >= step {
            remainder -= step;
            product = product
                .checked_mul(factor)
                .ok_or(AmmError::Overflow("exp factor"))?
                / ONE;
        }
    }

    // Taylor series for the sub-1 remainder: term_i = r^i / i!.
    // e / 21! bounds the truncation at about 5 * 10^-20.
    let mut term = ONE;
    let mut series = ONE;
    for i in 1u8..=20 {
        term = term * remainder / ONE / U256::from(i);
        series += term;
    }

    let small = product
        .checked_mul(series)
        .ok_or(AmmError::Overflow("exp series"))?
        / ONE;
    small
        .checked_mul(big_factor)
        .ok_or(AmmError::Overflow("exp result"))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn u(wei: u128) -> U256 {
        U256::from(wei)
    }

    const WEI_ONE: u128 = 1_000_000_000_000_000_000;

    /// Asserts `actual` is within `tolerance_wei` of `expected`.
    fn assert_close(actual: U256, expected: u128, tolerance_wei: u128) {
        let expected = u(expected);
        let diff = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        assert!(
            diff <= u(tolerance_wei),
            "actual {actual} vs expected {expected} (diff {diff})"
        );
    }

    #[test]
    fn pow_identity_exponent() {
        let Ok(result) = pow(u(3 * WEI_ONE), u(WEI_ONE)) else {
            panic!("expected Ok");
        };
        // 3^1 = 3, within kernel error
        assert_close(result, 3 * WEI_ONE, 100_000);
    }

    #[test]
    fn pow_square_root() {
        // 4^0.5 = 2
        let Ok(result) = pow(u(4 * WEI_ONE), u(WEI_ONE / 2)) else {
            panic!("expected Ok");
        };
        assert_close(result, 2 * WEI_ONE, 100_000);
    }

    #[test]
    fn pow_fractional_base() {
        // 0.5^2 = 0.25
        let Ok(result) = pow(u(WEI_ONE / 2), u(2 * WEI_ONE)) else {
            panic!("expected Ok");
        };
        assert_close(result, WEI_ONE / 4, 100_000);
    }

    #[test]
    fn pow_weighted_swap_shape() {
        // (10/11)^4 = 10000/14641 = 0.683013455...
        let base = u(909_090_909_090_909_090);
        let Ok(result) = pow(base, u(4 * WEI_ONE)) else {
            panic!("expected Ok");
        };
        assert_close(result, 683_013_455_365_070_000, 10_000_000_000);
    }

    #[test]
    fn pow_rejects_huge_exponent() {
        // ln(10^40 in fp terms) * big y blows past e^130
        let result = pow(u(WEI_ONE) * u(10u128.pow(22)), u(100 * WEI_ONE));
        assert!(matches!(result, Err(AmmError::Overflow(_))));
    }

    #[test]
    fn exp_of_known_values() {
        let Ok(e1) = exp(u(WEI_ONE)) else {
            panic!("expected Ok");
        };
        assert_close(e1, 2_718_281_828_459_045_235, 100_000);

        let Ok(e10) = exp(u(10 * WEI_ONE)) else {
            panic!("expected Ok");
        };
        // e^10 = 22026.4657948...
        assert_close(e10, 22_026_465_794_806_718_000_000, 100_000_000_000);
    }

    #[test]
    fn exp_of_zero_is_one() {
        let Ok(result) = exp(U256::zero()) else {
            panic!("expected Ok");
        };
        assert_eq!(result, ONE);
    }

    #[test]
    fn exp_large_argument_uses_big_factors() {
        // e^129 = 8.6593...e55; just check it does not overflow and is
        // bracketed by e^128 and e^130 magnitudes.
        let Ok(result) = exp(u(129 * WEI_ONE)) else {
            panic!("expected Ok");
        };
        assert!(result > E128_INT * ONE / U256::from(2u8));
        assert!(result < E128_INT * ONE * U256::from(3u8));
    }

    #[test]
    fn ln_of_known_values() {
        let Ok(ln_e) = ln(E1) else {
            panic!("expected Ok");
        };
        assert_close(ln_e, WEI_ONE, 100);

        let Ok(ln_two) = ln(u(2 * WEI_ONE)) else {
            panic!("expected Ok");
        };
        assert_close(ln_two, 693_147_180_559_945_309, 100);

        let Ok(ln_ten) = ln(u(10 * WEI_ONE)) else {
            panic!("expected Ok");
        };
        assert_close(ln_ten, 2_302_585_092_994_045_684, 1_000);
    }

    #[test]
    fn ln_of_one_is_zero() {
        let Ok(result) = ln(ONE) else {
            panic!("expected Ok");
        };
        assert_eq!(result, U256::zero());
    }

    #[test]
    fn exp_ln_round_trip() {
        for value in [WEI_ONE, 5 * WEI_ONE, 1234 * WEI_ONE, WEI_ONE * 1_000_000] {
            let Ok(logged) = ln(u(value)) else {
                panic!("expected Ok");
            };
            let Ok(back) = exp(logged) else {
                panic!("expected Ok");
            };
            // round trip within 10^-14 relative
            let tolerance = value / 100_000_000_000_000 + 10;
            assert_close(back, value, tolerance);
        }
    }
}
