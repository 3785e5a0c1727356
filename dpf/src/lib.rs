//! Implementation of a two-party distributed point function (DPF).
//!
//! A point function `f` is specified by two values `(alpha, beta)` such that
//! `f(alpha) = beta` and `f(x) = 0` for all other inputs `x != alpha`.
//!
//! A DPF scheme takes the description of a point function over the domain
//! `[0, 2^n)` with values in the ring `Z_{2^b}` and outputs two keys
//! `k_0, k_1`, each of which is on its own computationally indistinguishable
//! from random.  Evaluating both keys on the same input `x` yields additive
//! shares of `f`'s value: `Eval(k_0, x) + Eval(k_1, x) = f(x) mod 2^b`.
//! Summing the two shares is the caller's job; the two parties never need to
//! communicate to evaluate.
//!
//! The keys consist of a random root seed for a GGM tree of depth `n`, one
//! public correction word per tree level, and a final value correction word.
//! Key generation lives in [`keygen`], the evaluation walks (single point,
//! batch, full domain, and incremental level-by-level resumption) in [`eval`].

#![warn(missing_docs)]

pub mod error;
pub mod eval;
pub mod key;
pub mod keygen;
pub mod prg;
pub mod ring;
