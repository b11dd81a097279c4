//! Rounding direction for directional fixed-point arithmetic.
//!
//! # Convention
//!
//! **Always round against the counterparty** (pool-favorable):
//!
//! | Quantity | Direction | Rationale |
//! |----------|-----------|-----------|
//! | Amount paid out | [`Rounding::Down`] | Counterparty receives less |
//! | Amount taken in | [`Rounding::Up`] | Counterparty pays more |
//! | Fee amount | [`Rounding::Up`] | Pool keeps more |
//!
//! Getting a direction backwards does not fail loudly; it leaks value
//! out of the pool one wei at a time. Every directional operation on
//! [`FixedPoint`](crate::math::FixedPoint) therefore names its direction
//! explicitly (`mul_down`, `div_up`, ...) rather than taking a default.

use core::fmt;

/// Direction in which a non-exact arithmetic result is rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rounding {
    /// Round towards zero (floor).
    Down,
    /// Round towards positive infinity (ceiling).
    Up,
}

impl Rounding {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Down => Self::Up,
            Self::Up => Self::Down,
        }
    }
}

impl fmt::Display for Rounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => write!(f, "Down"),
            Self::Up => write!(f, "Up"),
        }
    }
}
