//! Key hashing and the base distribution primitive.
//!
//! # Jump Consistent Hash
//!
//! [`JumpHash`] is the base primitive every minimal-disruption engine builds on:
//! - O(ln n) computation with no memory
//! - Perfect balance: each bucket gets 1/n of the keys
//! - Monotonic: growing from n to n+1 buckets only moves keys onto bucket n
//!
//! Reference: "A Fast, Minimal Memory, Consistent Hash Algorithm"
//! by John Lamping and Eric Veach, Google 2014
//!
//! # Key hashers
//!
//! Engines hash keys through the [`KeyHasher`] trait. Two implementations ship
//! with the crate and are selectable by name through [`HashFunction`]: XXH3
//! (default) and SipHash-1-3 from the standard library.
//!
//! # Tiger Style
//!
//! - Pure functions with deterministic output
//! - No dynamic allocation
//! - Explicit bounds checking

use std::fmt;
use std::hash::DefaultHasher;
use std::hash::Hasher;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::error::BucketError;

/// XORed into XXH3 seeds so that seed 0 does not reproduce the unseeded hash.
const SEED_DOMAIN: u64 = 0x9E37_79B9_7F4A_7C15;

/// Deterministic 64-bit key hashing.
///
/// `hash_seeded` must produce streams that are decorrelated from `hash` and from
/// each other for distinct seeds; engines rely on this when they redistribute the
/// keys of a removed bucket.
pub trait KeyHasher: fmt::Debug {
    /// Hash a key.
    fn hash(&self, key: &[u8]) -> u64;

    /// Hash a key together with a seed.
    fn hash_seeded(&self, key: &[u8], seed: u64) -> u64;
}

/// Hash functions selectable by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashFunction {
    /// XXH3 64-bit.
    #[default]
    Xxh3,
    /// SipHash-1-3 with zero keys (`std::hash::DefaultHasher`).
    Sip,
}

impl HashFunction {
    /// All registered hash functions.
    pub const ALL: [HashFunction; 2] = [HashFunction::Xxh3, HashFunction::Sip];

    /// Canonical name of the hash function.
    pub fn name(self) -> &'static str {
        match self {
            HashFunction::Xxh3 => "xxh3",
            HashFunction::Sip => "sip",
        }
    }
}

impl KeyHasher for HashFunction {
    #[inline]
    fn hash(&self, key: &[u8]) -> u64 {
        match self {
            HashFunction::Xxh3 => xxh3_64(key),
            HashFunction::Sip => {
                let mut hasher = DefaultHasher::new();
                hasher.write(key);
                hasher.finish()
            }
        }
    }

    #[inline]
    fn hash_seeded(&self, key: &[u8], seed: u64) -> u64 {
        match self {
            HashFunction::Xxh3 => xxh3_64_with_seed(key, seed ^ SEED_DOMAIN),
            HashFunction::Sip => {
                let mut hasher = DefaultHasher::new();
                hasher.write_u64(seed);
                hasher.write(key);
                hasher.finish()
            }
        }
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashFunction {
    type Err = BucketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HashFunction::ALL
            .into_iter()
            .find(|function| function.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| BucketError::UnknownHashFunction { name: s.to_string() })
    }
}

/// Finalizer of MurmurHash3, applied to `value ^ seed`.
///
/// Used where an engine needs a fresh pseudo-random value derived from an
/// existing hash without touching the key bytes again.
#[inline]
pub fn mix64(value: u64, seed: u64) -> u64 {
    let mut h = value ^ seed.wrapping_mul(SEED_DOMAIN);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    h = h.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    h ^= h >> 33;
    h
}

/// Jump consistent hash implementation.
///
/// Maps a pre-hashed key to one of `num_buckets` buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct JumpHash;

impl JumpHash {
    /// Hash a key to a bucket in the range [0, num_buckets).
    ///
    /// # Panics
    ///
    /// Panics if `num_buckets` is 0.
    pub fn hash<H: KeyHasher + ?Sized>(hasher: &H, key: &[u8], num_buckets: u32) -> u32 {
        assert!(num_buckets > 0, "num_buckets must be > 0");
        Self::hash_u64(hasher.hash(key), num_buckets)
    }

    /// Hash a pre-hashed u64 key to a bucket.
    ///
    /// # Arguments
    ///
    /// * `key` - Pre-hashed key as u64
    /// * `num_buckets` - The number of buckets (must be > 0)
    ///
    /// # Returns
    ///
    /// A bucket index in [0, num_buckets)
    #[inline]
    pub fn hash_u64(mut key: u64, num_buckets: u32) -> u32 {
        debug_assert!(num_buckets > 0, "num_buckets must be > 0");
        let num_buckets = num_buckets as i64;
        let mut b: i64 = -1;
        let mut j: i64 = 0;

        while j < num_buckets {
            b = j;
            // Linear congruential generator for deterministic random sequence
            key = key.wrapping_mul(2862933555777941757).wrapping_add(1);
            // Use upper bits of key for floating point calculation
            j = ((b.wrapping_add(1) as f64) * (((1_i64) << 31) as f64 / ((key >> 33).wrapping_add(1) as f64))) as i64;
        }

        b as u32
    }

    /// Check if a key would move when changing from old_buckets to new_buckets.
    pub fn would_move<H: KeyHasher + ?Sized>(hasher: &H, key: &[u8], old_buckets: u32, new_buckets: u32) -> bool {
        let key_hash = hasher.hash(key);
        Self::hash_u64(key_hash, old_buckets) != Self::hash_u64(key_hash, new_buckets)
    }
}
