//! 18-decimal fixed-point arithmetic with directional rounding.
//!
//! [`FixedPoint`] represents a non-negative real number as an integer
//! scaled by 10^18, stored in a [`U256`] so that products of two
//! realistic pool quantities never overflow an intermediate.
//!
//! # Rounding contract
//!
//! Every non-exact operation exists in a `_down` (floor) and `_up`
//! (ceiling) variant. The caller must pick the direction that rounds in
//! the pool's favor: floor for amounts the pool pays out, ceiling for
//! amounts the pool takes in. Getting this backwards does not fail; it
//! leaks value one wei at a time, which is why no defaulted variant is
//! offered.
//!
//! # Examples
//!
//! ```
//! use basin_amm::math::FixedPoint;
//!
//! let half = FixedPoint::from_wei(500_000_000_000_000_000);
//! let third = FixedPoint::ONE.div_down(FixedPoint::from_wei(3_000_000_000_000_000_000)).unwrap();
//! assert!(half.mul_down(half).unwrap() < half.mul_up(half).unwrap().add(FixedPoint::WEI).unwrap());
//! assert!(third.complement().add(third).unwrap() <= FixedPoint::ONE);
//! ```

use core::fmt;

use primitive_types::U256;

use crate::domain::Rounding;
use crate::error::{AmmError, Result};
use crate::math::log_exp;

/// Raw value of 1.0 in 18-decimal fixed point.
const ONE_WEI: u64 = 1_000_000_000_000_000_000;

/// Maximum relative error of the log/exp `pow` kernel: 10^-14.
///
/// `pow_down`/`pow_up` widen the raw result by this margin (plus one
/// wei) so the true value always lies on the requested side.
const MAX_POW_RELATIVE_ERROR: FixedPoint = FixedPoint::from_wei_u64(10_000);

/// A non-negative real number scaled by 10^18.
///
/// All arithmetic is checked and returns [`Result`]; no operation
/// panics, saturates, or wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[must_use]
pub struct FixedPoint(U256);

impl FixedPoint {
    /// Zero.
    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));

    /// The smallest representable step (10^-18).
    pub const WEI: Self = Self(U256([1, 0, 0, 0]));

    /// 1.0.
    pub const ONE: Self = Self(U256([ONE_WEI, 0, 0, 0]));

    /// 2.0.
    pub const TWO: Self = Self(U256([2_000_000_000_000_000_000, 0, 0, 0]));

    /// 4.0.
    pub const FOUR: Self = Self(U256([4_000_000_000_000_000_000, 0, 0, 0]));

    /// Creates a value from a raw 10^18-scaled integer that fits in a
    /// `u64` (usable in `const` contexts).
    pub const fn from_wei_u64(wei: u64) -> Self {
        Self(U256([wei, 0, 0, 0]))
    }

    /// Creates a value from a raw 10^18-scaled integer.
    pub fn from_wei(wei: u128) -> Self {
        Self(U256::from(wei))
    }

    /// Creates a value representing the given whole number.
    pub fn from_integer(value: u64) -> Self {
        Self(U256::from(value) * U256::from(ONE_WEI))
    }

    /// Returns the raw 10^18-scaled representation.
    #[must_use]
    pub const fn as_u256(&self) -> U256 {
        self.0
    }

    /// Wraps a raw 10^18-scaled [`U256`].
    pub(crate) const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Returns `true` if the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if the sum exceeds 2^256 − 1.
    pub fn add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(AmmError::Overflow("fixed point addition"))
    }

    /// Checked subtraction.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Underflow`] if `other > self`.
    pub fn sub(self, other: Self) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(AmmError::Underflow("fixed point subtraction"))
    }

    /// Subtraction that floors at zero instead of failing.
    ///
    /// Used where a rounding-driven crossing below zero must read as
    /// "no excess" rather than as an error.
    pub fn sub_or_zero(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiplication rounding towards zero.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if the intermediate product
    /// exceeds 2^256 − 1.
    pub fn mul_down(self, other: Self) -> Result<Self> {
        let product = self
            .0
            .checked_mul(other.0)
            .ok_or(AmmError::Overflow("fixed point multiplication"))?;
        Ok(Self(product / Self::ONE.0))
    }

    /// Multiplication rounding towards positive infinity.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if the intermediate product
    /// exceeds 2^256 − 1.
    pub fn mul_up(self, other: Self) -> Result<Self> {
        let product = self
            .0
            .checked_mul(other.0)
            .ok_or(AmmError::Overflow("fixed point multiplication"))?;
        if product.is_zero() {
            Ok(Self::ZERO)
        } else {
            // ceil(p / ONE) = (p - 1) / ONE + 1 for p > 0
            Ok(Self((product - U256::one()) / Self::ONE.0 + U256::one()))
        }
    }

    /// Division rounding towards zero.
    ///
    /// # Errors
    ///
    /// - [`AmmError::DivisionByZero`] if `other` is zero.
    /// - [`AmmError::Overflow`] if the scaled numerator exceeds 2^256 − 1.
    pub fn div_down(self, other: Self) -> Result<Self> {
        if other.is_zero() {
            return Err(AmmError::DivisionByZero);
        }
        let numerator = self
            .0
            .checked_mul(Self::ONE.0)
            .ok_or(AmmError::Overflow("fixed point division"))?;
        Ok(Self(numerator / other.0))
    }

    /// Division rounding towards positive infinity.
    ///
    /// # Errors
    ///
    /// - [`AmmError::DivisionByZero`] if `other` is zero.
    /// - [`AmmError::Overflow`] if the scaled numerator exceeds 2^256 − 1.
    pub fn div_up(self, other: Self) -> Result<Self> {
        if other.is_zero() {
            return Err(AmmError::DivisionByZero);
        }
        if self.is_zero() {
            return Ok(Self::ZERO);
        }
        let numerator = self
            .0
            .checked_mul(Self::ONE.0)
            .ok_or(AmmError::Overflow("fixed point division"))?;
        Ok(Self((numerator - U256::one()) / other.0 + U256::one()))
    }

    /// Multiplication with an explicit [`Rounding`] direction.
    pub fn mul(self, other: Self, rounding: Rounding) -> Result<Self> {
        match rounding {
            Rounding::Down => self.mul_down(other),
            Rounding::Up => self.mul_up(other),
        }
    }

    /// Division with an explicit [`Rounding`] direction.
    pub fn div(self, other: Self, rounding: Rounding) -> Result<Self> {
        match rounding {
            Rounding::Down => self.div_down(other),
            Rounding::Up => self.div_up(other),
        }
    }

    /// Returns `1 − self`, floored at zero.
    ///
    /// The floor makes this the natural zero-fee guard: a "growth
    /// share" computed as `complement(prior / current)` reads as zero
    /// whenever `current <= prior`, never as a negative quantity.
    pub fn complement(self) -> Self {
        if self.0 < Self::ONE.0 {
            Self(Self::ONE.0 - self.0)
        } else {
            Self::ZERO
        }
    }

    /// `self^exponent`, guaranteed not to exceed the true value.
    ///
    /// Exponents 0, 1, 2 and 4 use exact multiplication chains; other
    /// exponents go through the log/exp kernel and are narrowed by
    /// [`MAX_POW_RELATIVE_ERROR`].
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if `exponent · ln(self)` exceeds
    /// the kernel's maximum natural exponent.
    pub fn pow_down(self, exponent: Self) -> Result<Self> {
        if exponent.is_zero() {
            return Ok(Self::ONE);
        }
        if self.is_zero() {
            return Ok(Self::ZERO);
        }
        if exponent == Self::ONE {
            return Ok(self);
        }
        if exponent == Self::TWO {
            return self.mul_down(self);
        }
        if exponent == Self::FOUR {
            let square = self.mul_down(self)?;
            return square.mul_down(square);
        }
        let raw = Self(log_exp::pow(self.0, exponent.0)?);
        let max_error = raw.mul_up(MAX_POW_RELATIVE_ERROR)?.add(Self::WEI)?;
        Ok(raw.sub_or_zero(max_error))
    }

    /// `self^exponent`, guaranteed not to fall below the true value.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if `exponent · ln(self)` exceeds
    /// the kernel's maximum natural exponent.
    pub fn pow_up(self, exponent: Self) -> Result<Self> {
        if exponent.is_zero() {
            return Ok(Self::ONE);
        }
        if self.is_zero() {
            return Ok(Self::ZERO);
        }
        if exponent == Self::ONE {
            return Ok(self);
        }
        if exponent == Self::TWO {
            return self.mul_up(self);
        }
        if exponent == Self::FOUR {
            let square = self.mul_up(self)?;
            return square.mul_up(square);
        }
        let raw = Self(log_exp::pow(self.0, exponent.0)?);
        let max_error = raw.mul_up(MAX_POW_RELATIVE_ERROR)?.add(Self::WEI)?;
        raw.add(max_error)
    }

    /// Returns the smaller of two values.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Returns the larger of two values.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let integer = self.0 / Self::ONE.0;
        let fraction = (self.0 % Self::ONE.0).low_u128();
        write!(f, "{integer}.{fraction:018}")
    }
}
