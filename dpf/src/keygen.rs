//! Key generation for the two-party DPF.

use crate::error::Error;
use crate::key::{CorrectionWord, DpfKey, DpfParameters};
use crate::prg::Prg;
use rand::{thread_rng, Rng};
use utils::bit_decompose::bit_decompose;

/// Generate a pair of DPF keys for the point function with `f(alpha) = beta`
/// and `f(x) = 0` for all `x != alpha` in `[0, 2^log_domain_size)`.
///
/// `beta` is reduced modulo `2^value_bit_width`; it is never rejected for its
/// magnitude.  Fails with [`Error::InvalidArgument`] if the parameters are
/// unsupported or `alpha` lies outside the domain.
///
/// The construction walks the path to `alpha` through the GGM trees of both
/// parties simultaneously, level by level.  At each level it emits one public
/// correction word, the XOR of the two parties' freshly expanded off-path
/// child states.  A party XORs the correction word into its children whenever
/// its current control bit is set; this cancels the two parties' seeds on
/// every subtree hanging off the path to `alpha` while leaving them
/// independent on the path itself.  A final value correction word makes the
/// leaf shares sum to `beta` at `alpha`.
pub fn generate_keys(
    params: DpfParameters,
    alpha: u128,
    beta: u128,
) -> Result<(DpfKey, DpfKey), Error> {
    params.validate()?;
    if !params.domain_contains(alpha) {
        return Err(Error::InvalidArgument(format!(
            "alpha = {alpha} is outside the domain of size 2^{}",
            params.log_domain_size
        )));
    }
    let ring = params.ring();
    let beta = ring.reduce(beta);
    let n = params.log_domain_size as usize;

    let prg = Prg::new();
    let mut rng = thread_rng();

    let root_seeds = [rng.gen::<u128>(), rng.gen::<u128>()];
    let mut seeds = root_seeds;
    let mut control_bits = [false, true];

    let alpha_bits: Vec<bool> = bit_decompose(alpha, n);
    let mut correction_words = Vec::with_capacity(n);

    for &alpha_bit in alpha_bits.iter() {
        let (children_0, bits_0) = prg.expand(seeds[0]);
        let (children_1, bits_1) = prg.expand(seeds[1]);
        let keep = alpha_bit as usize;
        let lose = 1 - keep;

        // the off-path children must cancel, the on-path control bits must
        // stay complementary
        let seed_correction = children_0[lose] ^ children_1[lose];
        let control_left = bits_0[0] ^ bits_1[0] ^ alpha_bit ^ true;
        let control_right = bits_0[1] ^ bits_1[1] ^ alpha_bit;
        let control_keep = if alpha_bit {
            control_right
        } else {
            control_left
        };

        let children = [children_0, children_1];
        let bits = [bits_0, bits_1];
        for party in 0..2 {
            if control_bits[party] {
                seeds[party] = children[party][keep] ^ seed_correction;
                control_bits[party] = bits[party][keep] ^ control_keep;
            } else {
                seeds[party] = children[party][keep];
                control_bits[party] = bits[party][keep];
            }
        }

        correction_words.push(CorrectionWord {
            seed: seed_correction,
            control_left,
            control_right,
        });
    }

    let leaf_0 = ring.reduce(prg.convert(seeds[0]));
    let leaf_1 = ring.reduce(prg.convert(seeds[1]));
    let mut value_correction = ring.add(ring.sub(beta, leaf_0), leaf_1);
    if control_bits[1] {
        value_correction = ring.neg(value_correction);
    }

    let key_0 = DpfKey {
        party_id: 0,
        params,
        root_seed: root_seeds[0],
        root_control_bit: false,
        correction_words: correction_words.clone(),
        value_correction,
    };
    let key_1 = DpfKey {
        party_id: 1,
        params,
        root_seed: root_seeds[1],
        root_control_bit: true,
        correction_words,
        value_correction,
    };
    Ok((key_0, key_1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_share_public_data() {
        let params = DpfParameters::new(10, 64).unwrap();
        let (key_0, key_1) = generate_keys(params, 0x2a5, 0x1337_4247).unwrap();
        assert_eq!(key_0.get_party_id(), 0);
        assert_eq!(key_1.get_party_id(), 1);
        assert_eq!(key_0.correction_words.len(), 10);
        assert_eq!(key_0.correction_words, key_1.correction_words);
        assert_eq!(key_0.value_correction, key_1.value_correction);
        assert!(!key_0.root_control_bit);
        assert!(key_1.root_control_bit);
        assert_ne!(key_0.root_seed, key_1.root_seed);
    }

    #[test]
    fn test_rejects_alpha_outside_domain() {
        let params = DpfParameters::new(3, 32).unwrap();
        assert!(matches!(
            generate_keys(params, 1 << 3, 42),
            Err(Error::InvalidArgument(_))
        ));
        assert!(generate_keys(params, (1 << 3) - 1, 42).is_ok());
    }

    #[test]
    fn test_rejects_unsupported_parameters() {
        let params = DpfParameters {
            log_domain_size: 3,
            value_bit_width: 129,
        };
        assert!(matches!(
            generate_keys(params, 0, 42),
            Err(Error::InvalidArgument(_))
        ));
        let params = DpfParameters {
            log_domain_size: 129,
            value_bit_width: 32,
        };
        assert!(matches!(
            generate_keys(params, 0, 42),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_beta_is_reduced() {
        let params = DpfParameters::new(0, 8).unwrap();
        let (key_0, key_1) = generate_keys(params, 0, 0x1_02).unwrap();
        let ring = params.ring();
        let share_0 = crate::eval::evaluate_at(&key_0, 0).unwrap();
        let share_1 = crate::eval::evaluate_at(&key_1, 0).unwrap();
        assert_eq!(ring.add(share_0, share_1), 0x02);
    }
}
