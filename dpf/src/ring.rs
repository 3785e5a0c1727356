//! Arithmetic in the value ring `Z_{2^b}`.
//!
//! The bit width `b` is chosen at runtime (between 1 and 128), so ring
//! elements are carried as `u128` values reduced modulo `2^b` via a mask.
//! Addition, subtraction, and negation wrap silently; overflow is never an
//! error condition.

/// The ring `Z_{2^b}` for a bit width `1 <= b <= 128`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueRing {
    mask: u128,
}

impl ValueRing {
    /// The largest supported bit width, fixed by the 128-bit output of the
    /// PRG's value extraction.
    pub const MAX_BIT_WIDTH: u32 = 128;

    /// Create the ring `Z_{2^bit_width}`.
    pub fn new(bit_width: u32) -> Self {
        debug_assert!(bit_width >= 1 && bit_width <= Self::MAX_BIT_WIDTH);
        let mask = if bit_width == Self::MAX_BIT_WIDTH {
            u128::MAX
        } else {
            (1u128 << bit_width) - 1
        };
        Self { mask }
    }

    /// Reduce an arbitrary `u128` into the ring.
    #[inline(always)]
    pub fn reduce(&self, x: u128) -> u128 {
        x & self.mask
    }

    /// Addition, wrapping modulo `2^b`.
    #[inline(always)]
    pub fn add(&self, a: u128, b: u128) -> u128 {
        a.wrapping_add(b) & self.mask
    }

    /// Subtraction, wrapping modulo `2^b`.
    #[inline(always)]
    pub fn sub(&self, a: u128, b: u128) -> u128 {
        a.wrapping_sub(b) & self.mask
    }

    /// Negation, wrapping modulo `2^b`.
    #[inline(always)]
    pub fn neg(&self, a: u128) -> u128 {
        a.wrapping_neg() & self.mask
    }
}
