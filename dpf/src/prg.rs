//! Pseudorandom generator for the GGM tree.
//!
//! Seeds are expanded with the fixed-key AES TMMO hash from
//! [`utils::fixed_key_aes`].  Tree expansion (left child, right child) and
//! leaf value extraction use distinct tweak constants, so the two modes are
//! domain separated while sharing a single AES key schedule.  Both parties,
//! key generation, and every evaluation observe the exact same expansion of a
//! given seed, which is what makes the correction-word bookkeeping sound.

use utils::fixed_key_aes::FixedKeyAes;

/// PRG expanding a 128-bit seed into two child seeds plus control bits, and
/// converting leaf seeds into value-ring elements.
#[derive(Clone, Debug)]
pub struct Prg {
    fkaes: FixedKeyAes,
}

impl Prg {
    /// Compiled-in AES key.  Must never change, or keys generated by one
    /// build become unevaluable by another.
    const FIXED_KEY_AES_KEY: [u8; 16] =
        0xc0de_f00d_3141_5926_c0de_f00d_2718_2818_u128.to_le_bytes();

    const TWEAK_TREE_LEFT: u128 = 0;
    const TWEAK_TREE_RIGHT: u128 = 1;
    const TWEAK_VALUE: u128 = 2;

    /// Create a PRG instance, expanding the fixed AES key schedule.
    pub fn new() -> Self {
        Self {
            fkaes: FixedKeyAes::new(Self::FIXED_KEY_AES_KEY),
        }
    }

    /// Expand a seed into `([seed_left, seed_right], [bit_left, bit_right])`.
    ///
    /// The control bits are the low bits of the freshly expanded child seeds,
    /// captured before any correction word is applied to them.
    #[inline(always)]
    pub fn expand(&self, seed: u128) -> ([u128; 2], [bool; 2]) {
        let seed_left = self.fkaes.hash_tccr(seed, Self::TWEAK_TREE_LEFT);
        let seed_right = self.fkaes.hash_tccr(seed, Self::TWEAK_TREE_RIGHT);
        (
            [seed_left, seed_right],
            [seed_left & 1 == 1, seed_right & 1 == 1],
        )
    }

    /// Convert a leaf seed into a (not yet reduced) value-ring element.
    #[inline(always)]
    pub fn convert(&self, seed: u128) -> u128 {
        self.fkaes.hash_tccr(seed, Self::TWEAK_VALUE)
    }
}

impl Default for Prg {
    fn default() -> Self {
        Self::new()
    }
}
