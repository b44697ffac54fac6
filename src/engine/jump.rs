//! Jump consistent hash exposed as a LIFO bucket engine.

use tracing::debug;

use super::check_growable;
use super::check_lifo_removal;
use super::check_size;
use super::BucketEngine;
use crate::error::Result;
use crate::hash::HashFunction;
use crate::hash::JumpHash;
use crate::hash::KeyHasher;

/// Stateless engine: the bucket count is the whole state.
#[derive(Debug, Clone)]
pub struct JumpEngine<H = HashFunction> {
    hasher: H,
    size: u32,
}

impl<H: KeyHasher> JumpEngine<H> {
    /// Create an engine with `size` buckets.
    pub fn new(size: u32, hasher: H) -> Result<Self> {
        check_size(size)?;
        Ok(Self { hasher, size })
    }
}

impl<H: KeyHasher + Send> BucketEngine for JumpEngine<H> {
    #[inline]
    fn get_bucket(&self, key: &[u8]) -> u32 {
        JumpHash::hash_u64(self.hasher.hash(key), self.size)
    }

    fn add_bucket(&mut self) -> Result<u32> {
        check_growable(self.size)?;
        let bucket = self.size;
        self.size += 1;
        debug!(bucket, size = self.size, "jump bucket added");
        Ok(bucket)
    }

    fn remove_bucket(&mut self, bucket: u32) -> Result<u32> {
        check_lifo_removal(bucket, self.size)?;
        self.size -= 1;
        debug!(bucket, size = self.size, "jump bucket removed");
        Ok(bucket)
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn array_size(&self) -> u32 {
        self.size
    }
}
