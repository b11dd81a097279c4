//! Token identity and decimal scaling.
//!
//! All pool math runs on 18-decimal [`FixedPoint`] values. Tokens with
//! fewer native decimals are upscaled on the way in and downscaled on
//! the way out by a per-token scaling factor of `10^(18 - decimals)`.

use core::fmt;

use crate::error::{AmmError, Result};
use crate::math::FixedPoint;

/// Opaque 20-byte token identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAddress(pub [u8; 20]);

impl TokenAddress {
    /// A deterministic test/demo address derived from a small seed.
    #[must_use]
    pub const fn from_seed(seed: u8) -> Self {
        let mut bytes = [0u8; 20];
        bytes[19] = seed;
        Self(bytes)
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A pool token: identity plus native decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    address: TokenAddress,
    decimals: u8,
}

impl Token {
    /// Creates a token description.
    ///
    /// # Errors
    ///
    /// [`AmmError::InvalidConfiguration`] for more than 18 decimals.
    pub fn new(address: TokenAddress, decimals: u8) -> Result<Self> {
        if decimals > 18 {
            return Err(AmmError::InvalidConfiguration("token exceeds 18 decimals"));
        }
        Ok(Self { address, decimals })
    }

    /// The token's identifier.
    #[must_use]
    pub const fn address(&self) -> TokenAddress {
        self.address
    }

    /// Native decimal count.
    #[must_use]
    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Factor that lifts native amounts into 18-decimal space.
    pub fn scaling_factor(&self) -> FixedPoint {
        let mut factor = FixedPoint::ONE.as_u256();
        for _ in self.decimals..18 {
            factor *= primitive_types::U256::from(10u64);
        }
        FixedPoint::from_raw(factor)
    }

    /// Lifts a native-decimals amount into 18-decimal space.
    pub fn upscale(&self, amount: FixedPoint) -> Result<FixedPoint> {
        amount.mul_down(self.scaling_factor())
    }

    /// Lowers an 18-decimal amount back to native decimals, rounding
    /// down (amounts leaving the pool).
    pub fn downscale_down(&self, amount: FixedPoint) -> Result<FixedPoint> {
        amount.div_down(self.scaling_factor())
    }

    /// Lowers an 18-decimal amount back to native decimals, rounding
    /// up (amounts owed to the pool).
    pub fn downscale_up(&self, amount: FixedPoint) -> Result<FixedPoint> {
        amount.div_up(self.scaling_factor())
    }
}
