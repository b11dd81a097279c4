//! Scoped re-entrancy protection for pool operations.
//!
//! Every public pool operation takes the lock for its whole body. The
//! lock is an RAII value: it releases when dropped, including on the
//! error paths, so a failed operation can never leave the pool
//! permanently sealed. A manual set/clear flag would do exactly that
//! on any early `?` return.

use core::cell::Cell;

use crate::error::{AmmError, Result};

/// A non-recursive entry flag.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: Cell<bool>,
}

impl ReentrancyGuard {
    /// A released guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entered: Cell::new(false),
        }
    }

    /// Takes the lock for the current scope.
    ///
    /// # Errors
    ///
    /// [`AmmError::ReentrancyDetected`] if the lock is already held.
    pub fn enter(&self) -> Result<EntryLock<'_>> {
        if self.entered.replace(true) {
            return Err(AmmError::ReentrancyDetected);
        }
        Ok(EntryLock { guard: self })
    }
}

/// Releases the owning [`ReentrancyGuard`] on drop.
#[derive(Debug)]
pub struct EntryLock<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for EntryLock<'_> {
    fn drop(&mut self) {
        self.guard.entered.set(false);
    }
}
