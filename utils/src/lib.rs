pub mod bit_decompose;
pub mod fixed_key_aes;
