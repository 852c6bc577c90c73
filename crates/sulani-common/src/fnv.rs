//! FNV-1 hashing utilities.
//!
//! The game hashes names, tuning ids and column names with 32- and 64-bit
//! FNV-1. String inputs are lower-cased before hashing so that `"Foo"` and
//! `"foo"` name the same thing.

const FNV32_OFFSET: u32 = 0x811C_9DC5;
const FNV32_PRIME: u32 = 0x0100_0193;
const FNV64_OFFSET: u64 = 0xCBF2_9CE4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01B3;

/// 32-bit FNV-1 of raw bytes.
#[inline]
pub fn fnv32_bytes(data: &[u8]) -> u32 {
    data.iter().fold(FNV32_OFFSET, |hash, &byte| {
        hash.wrapping_mul(FNV32_PRIME) ^ byte as u32
    })
}

/// 64-bit FNV-1 of raw bytes.
#[inline]
pub fn fnv64_bytes(data: &[u8]) -> u64 {
    data.iter().fold(FNV64_OFFSET, |hash, &byte| {
        hash.wrapping_mul(FNV64_PRIME) ^ byte as u64
    })
}

/// 32-bit FNV-1 of a string, lower-cased first.
#[inline]
pub fn fnv32(s: &str) -> u32 {
    fnv32_bytes(s.to_lowercase().as_bytes())
}

/// 64-bit FNV-1 of a string, lower-cased first.
#[inline]
pub fn fnv64(s: &str) -> u64 {
    fnv64_bytes(s.to_lowercase().as_bytes())
}
