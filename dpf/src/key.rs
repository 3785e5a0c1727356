//! DPF parameters, keys, and the wire encoding of keys.
//!
//! The wire encoding is fixed so that two parties running different
//! implementations can exchange keys and still compute bit-identical shares:
//!
//! ```text
//! party_id            : 1 byte (0 or 1)
//! log_domain_size     : LEB128 varint, minimal length
//! value_bit_width     : LEB128 varint, minimal length
//! root_seed           : 16 bytes, little endian
//! root_control_bit    : 1 byte (0 or 1)
//! correction_words[n] : 16 byte seed + 1 byte left bit + 1 byte right bit
//! value_correction    : ceil(value_bit_width / 8) bytes, big endian
//! ```

use crate::error::Error;
use crate::ring::ValueRing;

/// Parameters of a DPF: the sizes of its input domain and output ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct DpfParameters {
    /// Base-2 logarithm `n` of the domain size; the domain is `[0, 2^n)`.
    pub log_domain_size: u32,
    /// Bit width `b` of the value ring `Z_{2^b}`.
    pub value_bit_width: u32,
}

impl DpfParameters {
    /// The largest supported domain depth.  Domain points are carried as
    /// `u128`, so deeper trees cannot be indexed.
    pub const MAX_LOG_DOMAIN_SIZE: u32 = 128;

    /// Create a parameter set, checking both bounds.
    pub fn new(log_domain_size: u32, value_bit_width: u32) -> Result<Self, Error> {
        let params = Self {
            log_domain_size,
            value_bit_width,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check that the parameters are supported.
    pub fn validate(&self) -> Result<(), Error> {
        if self.log_domain_size > Self::MAX_LOG_DOMAIN_SIZE {
            return Err(Error::InvalidArgument(format!(
                "log_domain_size = {} exceeds the maximum of {}",
                self.log_domain_size,
                Self::MAX_LOG_DOMAIN_SIZE
            )));
        }
        if self.value_bit_width < 1 || self.value_bit_width > ValueRing::MAX_BIT_WIDTH {
            return Err(Error::InvalidArgument(format!(
                "value_bit_width = {} is outside the supported range [1, {}]",
                self.value_bit_width,
                ValueRing::MAX_BIT_WIDTH
            )));
        }
        Ok(())
    }

    /// Whether `x` lies in the domain `[0, 2^log_domain_size)`.
    #[inline(always)]
    pub fn domain_contains(&self, x: u128) -> bool {
        self.log_domain_size >= 128 || x < 1u128 << self.log_domain_size
    }

    /// The value ring `Z_{2^value_bit_width}`.
    pub fn ring(&self) -> ValueRing {
        ValueRing::new(self.value_bit_width)
    }
}

/// Public per-level correction data, identical in both keys of a pair.
///
/// Applied by a party whenever its control bit is set, it steers the two
/// parties' tree walks so that their seeds coincide on every path that leaves
/// the path to `alpha` and stay independently pseudorandom on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct CorrectionWord {
    /// XOR-correction for the child seed (same for both children).
    pub seed: u128,
    /// XOR-correction for the control bit when descending left.
    pub control_left: bool,
    /// XOR-correction for the control bit when descending right.
    pub control_right: bool,
}

/// One party's key of a DPF pair.
///
/// Immutable once generated.  The two keys of a pair carry identical
/// correction words and value correction; they differ only in the root seed
/// and the root control bit.
#[derive(Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct DpfKey {
    /// Party ID, 0 or 1.
    pub(crate) party_id: u8,
    /// Domain and value-ring sizes.
    pub(crate) params: DpfParameters,
    /// Random root seed of this party's GGM tree.
    pub(crate) root_seed: u128,
    /// Fixed root control bit: `false` for party 0, `true` for party 1.
    pub(crate) root_control_bit: bool,
    /// One correction word per tree level, `log_domain_size` in total.
    pub(crate) correction_words: Vec<CorrectionWord>,
    /// Final correction word in `Z_{2^value_bit_width}`.
    pub(crate) value_correction: u128,
}

impl DpfKey {
    /// Return the party ID, 0 or 1, corresponding to this key.
    pub fn get_party_id(&self) -> u8 {
        self.party_id
    }

    /// Return the parameters the key was generated for.
    pub fn get_params(&self) -> DpfParameters {
        self.params
    }

    /// Return the depth `n` of the key's GGM tree.
    pub fn get_log_domain_size(&self) -> u32 {
        self.params.log_domain_size
    }

    /// Encode the key into the wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let n = self.correction_words.len();
        let value_bytes = ((self.params.value_bit_width as usize) + 7) / 8;
        let mut bytes = Vec::with_capacity(1 + 10 + 10 + 16 + 1 + 18 * n + value_bytes);
        bytes.push(self.party_id);
        put_varint(&mut bytes, self.params.log_domain_size as u64);
        put_varint(&mut bytes, self.params.value_bit_width as u64);
        bytes.extend_from_slice(&self.root_seed.to_le_bytes());
        bytes.push(self.root_control_bit as u8);
        for cw in &self.correction_words {
            bytes.extend_from_slice(&cw.seed.to_le_bytes());
            bytes.push(cw.control_left as u8);
            bytes.push(cw.control_right as u8);
        }
        bytes.extend_from_slice(&self.value_correction.to_be_bytes()[16 - value_bytes..]);
        bytes
    }

    /// Decode a key from the wire format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = ByteReader::new(bytes);
        let party_id = reader.take_byte()?;
        if party_id > 1 {
            return Err(Error::MalformedKey(format!(
                "party_id = {party_id} is neither 0 nor 1"
            )));
        }
        let log_domain_size = reader.take_varint_u32()?;
        let value_bit_width = reader.take_varint_u32()?;
        let params = DpfParameters {
            log_domain_size,
            value_bit_width,
        };
        params
            .validate()
            .map_err(|_| Error::MalformedKey("unsupported parameters".to_owned()))?;
        let root_seed = reader.take_seed()?;
        let root_control_bit = reader.take_bit()?;
        let n = log_domain_size as usize;
        let mut correction_words = Vec::with_capacity(n);
        for _ in 0..n {
            correction_words.push(CorrectionWord {
                seed: reader.take_seed()?,
                control_left: reader.take_bit()?,
                control_right: reader.take_bit()?,
            });
        }
        let value_bytes = ((value_bit_width as usize) + 7) / 8;
        let mut buf = [0u8; 16];
        buf[16 - value_bytes..].copy_from_slice(reader.take(value_bytes)?);
        let value_correction = u128::from_be_bytes(buf);
        if params.ring().reduce(value_correction) != value_correction {
            return Err(Error::MalformedKey(
                "value_correction is not reduced modulo 2^value_bit_width".to_owned(),
            ));
        }
        reader.expect_end()?;
        Ok(Self {
            party_id,
            params,
            root_seed,
            root_control_bit,
            correction_words,
            value_correction,
        })
    }
}

fn put_varint(bytes: &mut Vec<u8>, mut x: u64) {
    while x >= 0x80 {
        bytes.push((x & 0x7f) as u8 | 0x80);
        x >>= 7;
    }
    bytes.push(x as u8);
}

/// Cursor over key bytes; every read checks for truncation.
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.bytes.len() - self.pos < len {
            return Err(Error::MalformedKey("unexpected end of key bytes".to_owned()));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_byte(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    fn take_bit(&mut self) -> Result<bool, Error> {
        match self.take_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(Error::MalformedKey(format!(
                "control byte = {b} is neither 0 nor 1"
            ))),
        }
    }

    fn take_seed(&mut self) -> Result<u128, Error> {
        let slice = self.take(16)?;
        Ok(u128::from_le_bytes(
            slice
                .try_into()
                .expect("does not fail since the slice is 16 bytes long"),
        ))
    }

    fn take_varint_u32(&mut self) -> Result<u32, Error> {
        let mut value: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.take_byte()?;
            // a terminating zero byte after the first one would encode
            // nothing, so only minimal-length varints are accepted
            if byte == 0 && shift != 0 {
                return Err(Error::MalformedKey(
                    "non-minimal varint encoding".to_owned(),
                ));
            }
            // the fifth byte may only carry the top four value bits
            if shift == 28 && byte & 0xf0 != 0 {
                return Err(Error::MalformedKey("varint exceeds 32 bits".to_owned()));
            }
            value |= ((byte & 0x7f) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::MalformedKey("varint exceeds 32 bits".to_owned()))
    }

    fn expect_end(&self) -> Result<(), Error> {
        if self.pos != self.bytes.len() {
            return Err(Error::MalformedKey(format!(
                "{} trailing bytes after the key",
                self.bytes.len() - self.pos
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::generate_keys;
    use rand::{thread_rng, Rng};

    fn random_key() -> DpfKey {
        let params = DpfParameters::new(8, 32).unwrap();
        let alpha = thread_rng().gen_range(0..256);
        let beta = thread_rng().gen::<u128>();
        let (key_0, key_1) = generate_keys(params, alpha, beta).unwrap();
        if thread_rng().gen() {
            key_0
        } else {
            key_1
        }
    }

    #[test]
    fn test_parameter_validation() {
        assert!(DpfParameters::new(0, 1).is_ok());
        assert!(DpfParameters::new(128, 128).is_ok());
        assert!(DpfParameters::new(129, 32).is_err());
        assert!(DpfParameters::new(3, 0).is_err());
        assert!(DpfParameters::new(3, 129).is_err());
    }

    #[test]
    fn test_domain_contains() {
        let params = DpfParameters::new(3, 32).unwrap();
        assert!(params.domain_contains(0));
        assert!(params.domain_contains(7));
        assert!(!params.domain_contains(8));
        let params = DpfParameters::new(128, 32).unwrap();
        assert!(params.domain_contains(u128::MAX));
    }

    #[test]
    fn test_wire_roundtrip() {
        let key = random_key();
        let bytes = key.to_bytes();
        let decoded = DpfKey::from_bytes(&bytes).unwrap();
        assert_eq!(key, decoded);
    }

    #[test]
    fn test_wire_roundtrip_odd_value_width() {
        let params = DpfParameters::new(4, 12).unwrap();
        let (key_0, _) = generate_keys(params, 11, 0xfff).unwrap();
        let bytes = key_0.to_bytes();
        // 12-bit value correction occupies exactly two bytes
        assert_eq!(
            bytes.len(),
            1 + 1 + 1 + 16 + 1 + 18 * 4 + 2,
            "unexpected wire size"
        );
        assert_eq!(DpfKey::from_bytes(&bytes).unwrap(), key_0);
    }

    #[test]
    fn test_decode_rejects_truncation_and_trailing_bytes() {
        let key = random_key();
        let bytes = key.to_bytes();
        for len in 0..bytes.len() {
            assert!(
                matches!(
                    DpfKey::from_bytes(&bytes[..len]),
                    Err(Error::MalformedKey(_))
                ),
                "truncation to {len} bytes not rejected"
            );
        }
        let mut extended = bytes;
        extended.push(0);
        assert!(matches!(
            DpfKey::from_bytes(&extended),
            Err(Error::MalformedKey(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_flag_bytes() {
        let key = random_key();
        let mut bytes = key.to_bytes();
        bytes[0] = 2;
        assert!(matches!(
            DpfKey::from_bytes(&bytes),
            Err(Error::MalformedKey(_))
        ));
        let mut bytes = key.to_bytes();
        // root control bit sits after party id, two varint bytes, and the seed
        bytes[1 + 1 + 1 + 16] = 0xff;
        assert!(matches!(
            DpfKey::from_bytes(&bytes),
            Err(Error::MalformedKey(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unsupported_parameters() {
        let key = random_key();
        let mut bytes = key.to_bytes();
        // value_bit_width = 0
        bytes[2] = 0;
        assert!(matches!(
            DpfKey::from_bytes(&bytes),
            Err(Error::MalformedKey(_))
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_varint() {
        let key = random_key();
        let bytes = key.to_bytes();
        // ten bytes encoding 2^64 in place of the log_domain_size varint
        // must not decode as a small in-range value
        let mut corrupted = vec![bytes[0]];
        corrupted.extend_from_slice(&[0x80; 9]);
        corrupted.push(0x02);
        corrupted.extend_from_slice(&bytes[2..]);
        assert!(matches!(
            DpfKey::from_bytes(&corrupted),
            Err(Error::MalformedKey(_))
        ));
        // five bytes encoding 2^32 overflow the 32-bit field
        let mut corrupted = vec![bytes[0], 0x80, 0x80, 0x80, 0x80, 0x10];
        corrupted.extend_from_slice(&bytes[2..]);
        assert!(matches!(
            DpfKey::from_bytes(&corrupted),
            Err(Error::MalformedKey(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_minimal_varint() {
        let key = random_key();
        let bytes = key.to_bytes();
        // 0x88 0x00 is an overlong encoding of log_domain_size = 8
        let mut corrupted = vec![bytes[0], 0x88, 0x00];
        corrupted.extend_from_slice(&bytes[2..]);
        assert!(matches!(
            DpfKey::from_bytes(&corrupted),
            Err(Error::MalformedKey(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unreduced_value_correction() {
        let params = DpfParameters::new(2, 4).unwrap();
        let (key_0, _) = generate_keys(params, 1, 3).unwrap();
        let mut bytes = key_0.to_bytes();
        // the 4-bit value correction occupies the final byte; set a high bit
        let last = bytes.len() - 1;
        bytes[last] |= 0x80;
        assert!(matches!(
            DpfKey::from_bytes(&bytes),
            Err(Error::MalformedKey(_))
        ));
    }

    #[test]
    fn test_bincode_roundtrip() {
        let key = random_key();
        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&key, config).unwrap();
        let (decoded, consumed): (DpfKey, usize) =
            bincode::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(key, decoded);
    }
}
