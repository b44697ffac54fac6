//! Memento hash with the reverse pointers kept in a table of their own.
//!
//! Lookups and the replacement records are the same as [`MementoEngine`]'s.
//! Instead of threading alias lists through the records, every removed bucket
//! files a [`ReversePointer`] under the working bucket it resolves to. The
//! pointer table allows several entries per key and hands them back newest
//! first, so moving a bucket's pointers onto its replacer and moving them back
//! on restore preserves their order.
//!
//! [`MementoEngine`]: super::MementoEngine

use snafu::ensure;
use tracing::debug;
use tracing::trace;

use super::check_growable;
use super::check_size;
use super::memento::lookup;
use super::BucketEngine;
use crate::constants::MIN_BUCKETS;
use crate::error::BucketNotLiveSnafu;
use crate::error::BucketOutOfRangeSnafu;
use crate::error::LastBucketSnafu;
use crate::error::Result;
use crate::hash::HashFunction;
use crate::hash::KeyHasher;
use crate::table::ChainedIndexTable;
use crate::table::TableEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Replacement {
    bucket: u32,
    size: u32,
    replacer: u32,
    resolved: u32,
    prev_removed: Option<u32>,
    aliased: u32,
}

impl TableEntry for Replacement {
    fn key(&self) -> u32 {
        self.bucket
    }
}

/// `bucket` currently resolves to the working bucket `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReversePointer {
    target: u32,
    bucket: u32,
}

impl TableEntry for ReversePointer {
    fn key(&self) -> u32 {
        self.target
    }
}

/// Memento engine backed by a replacement table and a reverse-pointer table.
#[derive(Debug)]
pub struct RecallEngine<H = HashFunction> {
    hasher: H,
    replacements: ChainedIndexTable<Replacement>,
    pointers: ChainedIndexTable<ReversePointer>,
    array_size: u32,
    last_removed: Option<u32>,
}

impl<H: KeyHasher> RecallEngine<H> {
    /// Create an engine with `size` working buckets and no removals.
    pub fn new(size: u32, hasher: H) -> Result<Self> {
        check_size(size)?;
        Ok(Self {
            hasher,
            replacements: ChainedIndexTable::new(),
            pointers: ChainedIndexTable::new(),
            array_size: size,
            last_removed: None,
        })
    }

    /// The bucket `add_bucket` would restore next, if any.
    pub fn last_removed(&self) -> Option<u32> {
        self.last_removed
    }

    fn resolve(&self, bucket: u32) -> u32 {
        self.replacements.get(bucket).map_or(bucket, |replacement| replacement.resolved)
    }

    /// Move up to `limit` pointers filed under `from` onto `to`, newest first.
    fn move_pointers(&mut self, from: u32, to: u32, limit: u32) -> u32 {
        let mut moved = 0;
        while moved < limit {
            let Some(pointer) = self.pointers.remove(from) else {
                break;
            };
            if let Some(replacement) = self.replacements.get_mut(pointer.bucket) {
                replacement.resolved = to;
            }
            self.pointers.add(ReversePointer {
                target: to,
                bucket: pointer.bucket,
            });
            moved += 1;
        }
        trace!(from, to, moved, "reverse pointers moved");
        moved
    }

    fn remember(&mut self, bucket: u32) {
        let size = self.array_size - self.replacements.len() as u32 - 1;
        let replacer = self.resolve(size);
        let aliased = if replacer == bucket {
            0
        } else {
            let aliased = self.move_pointers(bucket, replacer, u32::MAX);
            self.pointers.add(ReversePointer {
                target: replacer,
                bucket,
            });
            aliased
        };
        self.replacements.add(Replacement {
            bucket,
            size,
            replacer,
            resolved: replacer,
            prev_removed: self.last_removed,
            aliased,
        });
        self.last_removed = Some(bucket);
    }

    fn restore(&mut self, bucket: u32) -> u32 {
        let Some(replacement) = self.replacements.remove(bucket) else {
            unreachable!("undo stack top {bucket} has no replacement record");
        };
        self.last_removed = replacement.prev_removed;
        if replacement.replacer != bucket {
            let own = self.pointers.remove(replacement.replacer);
            debug_assert_eq!(own.map(|pointer| pointer.bucket), Some(bucket));
            let moved = self.move_pointers(replacement.replacer, bucket, replacement.aliased);
            debug_assert_eq!(moved, replacement.aliased);
        }
        bucket
    }
}

impl<H: KeyHasher + Send> BucketEngine for RecallEngine<H> {
    fn get_bucket(&self, key: &[u8]) -> u32 {
        lookup(&self.hasher, key, self.array_size, |bucket| {
            self.replacements.get(bucket).map(|replacement| (replacement.size, replacement.replacer))
        })
    }

    fn add_bucket(&mut self) -> Result<u32> {
        let bucket = match self.last_removed {
            Some(bucket) => self.restore(bucket),
            None => {
                check_growable(self.array_size)?;
                self.array_size += 1;
                self.array_size - 1
            }
        };
        debug!(bucket, size = self.size(), array_size = self.array_size, "recall bucket added");
        Ok(bucket)
    }

    fn remove_bucket(&mut self, bucket: u32) -> Result<u32> {
        ensure!(
            bucket < self.array_size,
            BucketOutOfRangeSnafu {
                bucket,
                array_size: self.array_size
            }
        );
        ensure!(!self.replacements.contains_key(bucket), BucketNotLiveSnafu { bucket });
        ensure!(self.size() > MIN_BUCKETS, LastBucketSnafu { bucket });

        if self.last_removed.is_none() && bucket == self.array_size - 1 {
            self.array_size -= 1;
        } else {
            self.remember(bucket);
        }
        debug!(bucket, size = self.size(), array_size = self.array_size, "recall bucket removed");
        Ok(bucket)
    }

    fn size(&self) -> u32 {
        self.array_size - self.replacements.len() as u32
    }

    fn array_size(&self) -> u32 {
        self.array_size
    }

    fn is_working(&self, bucket: u32) -> bool {
        bucket < self.array_size && !self.replacements.contains_key(bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MementoEngine;
    use crate::error::BucketError;

    fn engine(size: u32) -> RecallEngine {
        RecallEngine::new(size, HashFunction::Xxh3).unwrap()
    }

    fn keys(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("key_{}", i)).collect()
    }

    /// Every pointer agrees with the record it points from.
    fn check_pointers(engine: &RecallEngine) {
        for pointer in engine.pointers.iter() {
            let record = engine.replacements.get(pointer.bucket).expect("pointer from a removed bucket");
            assert_eq!(record.resolved, pointer.target);
        }
    }

    #[test]
    fn test_remove_first_then_last() {
        let mut engine = engine(10);
        engine.remove_bucket(0).unwrap();
        engine.remove_bucket(9).unwrap();
        assert_eq!(engine.size(), 8);
        assert_eq!(engine.array_size(), 10);
        assert_eq!(engine.last_removed(), Some(9));

        assert_eq!(engine.add_bucket().unwrap(), 9);
        assert_eq!(engine.add_bucket().unwrap(), 0);
        assert_eq!(engine.add_bucket().unwrap(), 10);
        assert!(engine.replacements.is_empty());
        assert!(engine.pointers.is_empty());
    }

    #[test]
    fn test_pointers_follow_chained_removals() {
        let mut engine = engine(8);
        engine.remove_bucket(0).unwrap();
        engine.remove_bucket(7).unwrap();
        engine.remove_bucket(6).unwrap();
        assert_eq!(engine.resolve(0), 5);
        assert_eq!(engine.resolve(7), 5);
        assert_eq!(engine.pointers.len(), 3);
        check_pointers(&engine);

        assert_eq!(engine.add_bucket().unwrap(), 6);
        assert_eq!(engine.resolve(0), 6);
        assert_eq!(engine.resolve(7), 6);
        check_pointers(&engine);
    }

    #[test]
    fn test_restore_order_is_reverse_of_removal() {
        let mut engine = engine(6);
        for bucket in [0, 3, 1, 4, 5] {
            engine.remove_bucket(bucket).unwrap();
            check_pointers(&engine);
        }
        for expected in [5, 4, 1, 3, 0] {
            assert_eq!(engine.add_bucket().unwrap(), expected);
            check_pointers(&engine);
        }
        assert_eq!(engine.size(), 6);
        assert!(engine.pointers.is_empty());
    }

    #[test]
    fn test_matches_single_table_engine() {
        let mut recall = engine(64);
        let mut memento = MementoEngine::new(64, HashFunction::Xxh3).unwrap();
        let keys = keys(2_000);
        let removals = [13, 63, 0, 40, 62, 61, 7, 33, 60, 1, 59, 2];

        for bucket in removals {
            assert_eq!(recall.remove_bucket(bucket), memento.remove_bucket(bucket));
            for key in &keys {
                assert_eq!(recall.get_bucket(key.as_bytes()), memento.get_bucket(key.as_bytes()));
            }
        }
        for _ in removals {
            assert_eq!(recall.add_bucket(), memento.add_bucket());
            for key in &keys {
                assert_eq!(recall.get_bucket(key.as_bytes()), memento.get_bucket(key.as_bytes()));
            }
        }
        assert_eq!(recall.size(), memento.size());
    }

    #[test]
    fn test_rejects_invalid_removals() {
        let mut engine = engine(3);
        assert_eq!(engine.remove_bucket(7), Err(BucketError::BucketOutOfRange { bucket: 7, array_size: 3 }));
        engine.remove_bucket(0).unwrap();
        assert_eq!(engine.remove_bucket(0), Err(BucketError::BucketNotLive { bucket: 0 }));
        engine.remove_bucket(1).unwrap();
        assert_eq!(engine.remove_bucket(2), Err(BucketError::LastBucket { bucket: 2 }));
        assert!(engine.is_working(2));
        assert!(!engine.is_working(1));
    }
}
