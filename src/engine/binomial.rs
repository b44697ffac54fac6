//! Binomial hash: zero-memory consistent hashing with LIFO resizing.
//!
//! Buckets are seen as the nodes of a binary tree laid out level by level:
//! level `k` holds positions `[2^k, 2^(k+1))`. A key is first placed inside the
//! smallest complete tree covering `n` (the *enclosing* range), then relocated
//! pseudo-randomly inside its level so that partially filled levels do not
//! over-represent their low positions.
//!
//! ```text
//! n = 6, enclosing_filter = 0b111, minor_filter = 0b011
//!
//! level 0: [0]
//! level 0: [1]
//! level 1: [2 3]
//! level 2: [4 5 | 6 7]   <- 6 and 7 are not buckets yet
//! ```
//!
//! A candidate that lands past `n` is retried a few times over the whole
//! enclosing range. The last resort masks with the minor filter, whose range is
//! entirely made of valid buckets.
//!
//! # Tiger Style
//!
//! - Bounded work per lookup: at most `BINOMIAL_MAX_RETRIES + 2` relocations
//! - Only the top bucket may be removed; anything else is rejected

use tracing::debug;

use super::check_growable;
use super::check_lifo_removal;
use super::check_size;
use super::BucketEngine;
use crate::constants::BINOMIAL_MAX_RETRIES;
use crate::error::Result;
use crate::hash::mix64;
use crate::hash::HashFunction;
use crate::hash::KeyHasher;

/// Seed chaining the whole-range retries.
const RETRY_SEED: u64 = 0xA076_1D64_78BD_642F;

/// Binomial hash engine.
#[derive(Debug, Clone)]
pub struct BinomialEngine<H = HashFunction> {
    hasher: H,
    size: u32,
    /// `2^k - 1` for the smallest `k` with `2^k - 1 >= size`.
    enclosing_filter: u32,
    /// `enclosing_filter >> 1`: every position it covers is a valid bucket.
    minor_filter: u32,
}

impl<H: KeyHasher> BinomialEngine<H> {
    /// Create an engine with `size` buckets.
    pub fn new(size: u32, hasher: H) -> Result<Self> {
        check_size(size)?;
        let enclosing_filter = (size + 1).next_power_of_two() - 1;
        Ok(Self {
            hasher,
            size,
            enclosing_filter,
            minor_filter: enclosing_filter >> 1,
        })
    }

    /// Mask covering the enclosing tree.
    pub fn enclosing_filter(&self) -> u32 {
        self.enclosing_filter
    }

    /// Mask covering the always-valid part of the tree.
    pub fn minor_filter(&self) -> u32 {
        self.minor_filter
    }
}

/// Move `position` to a pseudo-random position of the same tree level.
///
/// Depends only on the position and the hash, never on the bucket count, so
/// that growing inside one enclosing range only moves keys onto the new bucket.
#[inline]
fn relocate_within_level(position: u32, hash: u64) -> u32 {
    if position < 2 {
        return position;
    }
    let level_base = 1u32 << (u32::BITS - 1 - position.leading_zeros());
    let level_filter = level_base - 1;
    level_base + (mix64(hash, u64::from(level_filter)) as u32 & level_filter)
}

impl<H: KeyHasher + Send> BucketEngine for BinomialEngine<H> {
    fn get_bucket(&self, key: &[u8]) -> u32 {
        let hash = self.hasher.hash(key);

        let bucket = relocate_within_level(hash as u32 & self.enclosing_filter, hash);
        if bucket < self.size {
            return bucket;
        }

        let mut retry_hash = hash;
        for _ in 0..BINOMIAL_MAX_RETRIES {
            retry_hash = mix64(retry_hash, RETRY_SEED);
            // Candidates inside the minor range relocate to valid buckets, so
            // this also returns early for them.
            let bucket = relocate_within_level(retry_hash as u32 & self.enclosing_filter, retry_hash);
            if bucket < self.size {
                return bucket;
            }
        }

        let bucket = relocate_within_level(hash as u32 & self.minor_filter, hash);
        debug_assert!(bucket < self.size, "minor range must only contain valid buckets");
        bucket
    }

    fn add_bucket(&mut self) -> Result<u32> {
        check_growable(self.size)?;
        let bucket = self.size;
        self.size += 1;
        if self.size > self.enclosing_filter {
            self.enclosing_filter = (self.enclosing_filter << 1) | 1;
            self.minor_filter = (self.minor_filter << 1) | 1;
        }
        debug!(bucket, size = self.size, enclosing_filter = self.enclosing_filter, "binomial bucket added");
        Ok(bucket)
    }

    fn remove_bucket(&mut self, bucket: u32) -> Result<u32> {
        check_lifo_removal(bucket, self.size)?;
        self.size -= 1;
        if self.size <= self.minor_filter {
            self.enclosing_filter >>= 1;
            self.minor_filter >>= 1;
        }
        debug!(bucket, size = self.size, enclosing_filter = self.enclosing_filter, "binomial bucket removed");
        Ok(bucket)
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn array_size(&self) -> u32 {
        self.size
    }
}
