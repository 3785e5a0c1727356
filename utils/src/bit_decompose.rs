//! Functionality to compute the bit decomposition of integers.

use num::PrimInt;

/// Decompose an integer `x` into a vector of its `n_bits` bits, most significant first.
pub fn bit_decompose<T: PrimInt, U: From<bool>>(x: T, n_bits: usize) -> Vec<U> {
    assert!(n_bits as u32 == T::zero().count_zeros() || x < T::one() << n_bits);
    (0..n_bits).map(|i| bit_at(x, i, n_bits).into()).collect()
}

/// Probe bit `i` of an `n_bits`-wide integer `x`, where bit 0 is the most significant.
#[inline(always)]
pub fn bit_at<T: PrimInt>(x: T, i: usize, n_bits: usize) -> bool {
    debug_assert!(i < n_bits);
    x & (T::one() << (n_bits - i - 1)) != T::zero()
}
