//! Share-supply ledger with a preminted reserve.
//!
//! Instead of minting shares on demand, a pool premints the entire
//! 2^111 share supply to itself at construction and "mints" by
//! releasing shares from that reserve. The supply actually in
//! circulation, the **virtual supply**, is what all per-share math
//! divides by; tracking it as `preminted - reserve` makes the two
//! impossible to desynchronize.
//!
//! The very first join permanently locks [`MINIMUM_SHARES`] in
//! circulation, so the virtual supply can never return to zero and
//! per-share prices stay defined for the pool's whole life.

use primitive_types::U256;

use crate::error::{AmmError, Result};
use crate::math::FixedPoint;

/// Total share supply preminted at pool construction: 2^111.
pub const PREMINTED_SHARES: FixedPoint = FixedPoint::from_raw(U256([0, 1 << 47, 0, 0]));

/// Shares locked forever by the first join: 10^6 wei.
pub const MINIMUM_SHARES: FixedPoint = FixedPoint::from_wei_u64(1_000_000);

/// Shares released to the parties of the initial join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitMint {
    /// Permanently locked; belongs to no one.
    pub locked: FixedPoint,
    /// Credited to the initial joiner.
    pub to_recipient: FixedPoint,
}

/// Tracks how much of the preminted supply remains in reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplyLedger {
    reserve: FixedPoint,
}

impl Default for SupplyLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplyLedger {
    /// A fresh ledger with the full premint in reserve and nothing in
    /// circulation.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reserve: PREMINTED_SHARES,
        }
    }

    /// Shares currently in circulation.
    pub fn virtual_supply(&self) -> FixedPoint {
        // reserve never exceeds the premint
        PREMINTED_SHARES.sub_or_zero(self.reserve)
    }

    /// Whether the initial join has happened.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        !self.virtual_supply().is_zero()
    }

    /// Releases the initial share amount, splitting off the locked
    /// minimum.
    ///
    /// # Errors
    ///
    /// - [`AmmError::InvalidConfiguration`] if already initialized.
    /// - [`AmmError::InvalidQuantity`] if `initial_shares` does not
    ///   exceed [`MINIMUM_SHARES`].
    pub fn initialize(&mut self, initial_shares: FixedPoint) -> Result<InitMint> {
        if self.is_initialized() {
            return Err(AmmError::InvalidConfiguration("supply already initialized"));
        }
        if initial_shares <= MINIMUM_SHARES {
            return Err(AmmError::InvalidQuantity("initial join below minimum shares"));
        }
        self.reserve = self.reserve.sub(initial_shares)?;
        Ok(InitMint {
            locked: MINIMUM_SHARES,
            to_recipient: initial_shares.sub(MINIMUM_SHARES)?,
        })
    }

    /// Releases `shares` into circulation.
    ///
    /// # Errors
    ///
    /// [`AmmError::Overflow`] if the reserve is exhausted (the pool
    /// has issued its entire 2^111 premint).
    pub fn mint(&mut self, shares: FixedPoint) -> Result<()> {
        self.reserve = self
            .reserve
            .sub(shares)
            .map_err(|_| AmmError::Overflow("share reserve exhausted"))?;
        Ok(())
    }

    /// Returns `shares` from circulation to the reserve.
    ///
    /// # Errors
    ///
    /// [`AmmError::InvalidQuantity`] if the burn would reach into the
    /// permanently locked minimum.
    pub fn burn(&mut self, shares: FixedPoint) -> Result<()> {
        let circulating = self.virtual_supply();
        let available = circulating.sub_or_zero(MINIMUM_SHARES);
        if shares > available {
            return Err(AmmError::InvalidQuantity("burn exceeds circulating shares"));
        }
        self.reserve = self.reserve.add(shares)?;
        Ok(())
    }
}
