//! Bitmask tools for working with detector channel patterns

use num_traits::{PrimInt, Unsigned};

use crate::{Error, Result, NCHAN};

/// Check that a channel index addresses one of the card's inputs
pub fn check_channel(ch: u8) -> Result<u8> {
    if (ch as usize) < NCHAN {
        Ok(ch)
    } else {
        Err(Error::InvalidChannel(ch))
    }
}

/// Bit test on unsigned masks
pub trait BitOps: PrimInt + Unsigned {
    fn check(self, b: usize) -> bool;
}

impl<T: PrimInt + Unsigned> BitOps for T {
    #[inline]
    fn check(self, b: usize) -> bool {
        (self >> b) & T::one() == T::one()
    }
}
