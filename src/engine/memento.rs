//! Memento hash over a single chained index table.
//!
//! Lookups start from [`JumpHash`] over the array size. Removing a bucket that
//! is not the top of the array leaves a *replacement record* behind instead of
//! shrinking the array:
//!
//! - `size`: working size right after the removal. Keys that reach the removed
//!   bucket are rehashed (seeded with the bucket) over `[0, size)`.
//! - `replacer`: the working bucket that took the removed bucket's place, i.e.
//!   bucket `size` or whatever stood in for it at removal time. A lookup
//!   rehashed by a *later* removal that lands on this bucket jumps straight to
//!   the replacer.
//! - `prev_removed`: the bucket removed just before, so that records form the
//!   undo stack that `add_bucket` pops.
//!
//! Removal must find the bucket currently standing in for position `size` in
//! O(1). Each record therefore also tracks `resolved`, the working bucket its
//! replacer chain currently ends on. Records sharing a `resolved` bucket are
//! threaded into an alias list whose head lives in the same table, filed under
//! the working bucket itself (a bucket is either removed or working, so the
//! two kinds of entry never share a key):
//!
//! ```text
//! Removed(9) -> alias_next Removed(4) -> alias_next None
//! Aliases(7) { head: 9 }      // 9 and 4 both resolve to working bucket 7
//! ```
//!
//! Removing a bucket that others resolve through splices its alias list onto
//! its own replacer's list; restoring it splits the list again.

use snafu::ensure;
use tracing::debug;

use super::check_growable;
use super::check_size;
use super::BucketEngine;
use crate::constants::MIN_BUCKETS;
use crate::error::BucketNotLiveSnafu;
use crate::error::BucketOutOfRangeSnafu;
use crate::error::LastBucketSnafu;
use crate::error::Result;
use crate::hash::HashFunction;
use crate::hash::JumpHash;
use crate::hash::KeyHasher;
use crate::table::ChainedIndexTable;
use crate::table::TableEntry;

/// Bookkeeping left behind by a removed bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Replacement {
    bucket: u32,
    size: u32,
    replacer: u32,
    resolved: u32,
    prev_removed: Option<u32>,
    /// Next record in the alias list of `resolved`.
    alias_next: Option<u32>,
    /// How many records were moved from this bucket's alias list onto
    /// `resolved`'s list when this bucket was removed.
    aliased: u32,
}

/// Head of the alias list of a working bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AliasHead {
    bucket: u32,
    head: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Removed(Replacement),
    Aliases(AliasHead),
}

impl TableEntry for Slot {
    fn key(&self) -> u32 {
        match self {
            Slot::Removed(replacement) => replacement.bucket,
            Slot::Aliases(aliases) => aliases.bucket,
        }
    }
}

/// Memento engine storing replacement records and alias lists in one table.
#[derive(Debug)]
pub struct MementoEngine<H = HashFunction> {
    hasher: H,
    slots: ChainedIndexTable<Slot>,
    array_size: u32,
    removed: u32,
    last_removed: Option<u32>,
}

impl<H: KeyHasher> MementoEngine<H> {
    /// Create an engine with `size` working buckets and no removals.
    pub fn new(size: u32, hasher: H) -> Result<Self> {
        check_size(size)?;
        Ok(Self {
            hasher,
            slots: ChainedIndexTable::new(),
            array_size: size,
            removed: 0,
            last_removed: None,
        })
    }

    /// The bucket `add_bucket` would restore next, if any.
    pub fn last_removed(&self) -> Option<u32> {
        self.last_removed
    }

    fn replacement(&self, bucket: u32) -> Option<&Replacement> {
        match self.slots.get(bucket) {
            Some(Slot::Removed(replacement)) => Some(replacement),
            _ => None,
        }
    }

    fn replacement_mut(&mut self, bucket: u32) -> Option<&mut Replacement> {
        match self.slots.get_mut(bucket) {
            Some(Slot::Removed(replacement)) => Some(replacement),
            _ => None,
        }
    }

    fn alias_head(&self, bucket: u32) -> Option<u32> {
        match self.slots.get(bucket) {
            Some(Slot::Aliases(aliases)) => Some(aliases.head),
            _ => None,
        }
    }

    /// Point the alias list of `bucket` at `head`, or drop it when empty.
    fn set_alias_head(&mut self, bucket: u32, head: Option<u32>) {
        let listed = self.alias_head(bucket).is_some();
        match head {
            Some(head) if listed => {
                if let Some(Slot::Aliases(aliases)) = self.slots.get_mut(bucket) {
                    aliases.head = head;
                }
            }
            Some(head) => self.slots.add(Slot::Aliases(AliasHead { bucket, head })),
            None if listed => {
                self.slots.remove(bucket);
            }
            None => {}
        }
    }

    /// Working bucket currently standing in for `bucket`.
    fn resolve(&self, bucket: u32) -> u32 {
        self.replacement(bucket).map_or(bucket, |replacement| replacement.resolved)
    }

    fn remember(&mut self, bucket: u32) {
        let size = self.array_size - self.removed - 1;
        let replacer = self.resolve(size);
        let mut replacement = Replacement {
            bucket,
            size,
            replacer,
            resolved: replacer,
            prev_removed: self.last_removed,
            alias_next: None,
            aliased: 0,
        };

        if replacer != bucket {
            // Everything resolving through `bucket` now resolves through `replacer`.
            let moved_head = self.alias_head(bucket);
            self.set_alias_head(bucket, None);

            let mut tail = None;
            let mut cursor = moved_head;
            while let Some(alias) = cursor {
                let Some(record) = self.replacement_mut(alias) else {
                    break;
                };
                record.resolved = replacer;
                tail = Some(alias);
                cursor = record.alias_next;
                replacement.aliased += 1;
            }

            let previous_head = self.alias_head(replacer);
            match tail.and_then(|tail| self.replacement_mut(tail)) {
                Some(record) => record.alias_next = previous_head,
                None => debug_assert!(moved_head.is_none()),
            }
            replacement.alias_next = moved_head.or(previous_head);
            self.set_alias_head(replacer, Some(bucket));
        } else {
            // `bucket` stood in for the position it vacates. Its alias list
            // hangs off its own record until it is restored.
            replacement.alias_next = self.alias_head(bucket);
            self.set_alias_head(bucket, None);
        }

        self.slots.add(Slot::Removed(replacement));
        self.removed += 1;
        self.last_removed = Some(bucket);
    }

    /// Pop the undo stack and return the restored bucket.
    fn restore(&mut self, bucket: u32) -> u32 {
        let Some(Slot::Removed(replacement)) = self.slots.remove(bucket) else {
            unreachable!("undo stack top {bucket} has no replacement record");
        };
        self.removed -= 1;
        self.last_removed = replacement.prev_removed;

        if replacement.replacer == bucket {
            self.set_alias_head(bucket, replacement.alias_next);
        } else {
            // The alias list of `replacer` starts with `bucket`, followed by the
            // records it carried over, followed by the list as it was before.
            let moved_head = (replacement.aliased > 0).then_some(replacement.alias_next).flatten();
            let mut cursor = replacement.alias_next;
            let mut tail = None;
            for _ in 0..replacement.aliased {
                let Some(alias) = cursor else {
                    break;
                };
                let Some(record) = self.replacement_mut(alias) else {
                    break;
                };
                record.resolved = bucket;
                tail = Some(alias);
                cursor = record.alias_next;
            }
            if let Some(record) = tail.and_then(|tail| self.replacement_mut(tail)) {
                record.alias_next = None;
            }
            self.set_alias_head(replacement.replacer, cursor);
            self.set_alias_head(bucket, moved_head);
        }
        bucket
    }
}

/// Memento lookup over any record store.
///
/// `record(bucket)` returns the `(size, replacer)` pair left by the removal of
/// `bucket`, or `None` for a working bucket.
pub(super) fn lookup<H, F>(hasher: &H, key: &[u8], array_size: u32, record: F) -> u32
where
    H: KeyHasher,
    F: Fn(u32) -> Option<(u32, u32)>,
{
    let mut bucket = JumpHash::hash_u64(hasher.hash(key), array_size);
    while let Some((size, _)) = record(bucket) {
        bucket = (hasher.hash_seeded(key, u64::from(bucket)) % u64::from(size)) as u32;
        // Buckets removed before the current one were already replaced by a
        // bucket reachable from here: jump over them.
        while let Some((_, replacer)) = record(bucket).filter(|&(older, _)| older >= size) {
            debug_assert_ne!(replacer, bucket);
            bucket = replacer;
        }
    }
    bucket
}

impl<H: KeyHasher + Send> BucketEngine for MementoEngine<H> {
    fn get_bucket(&self, key: &[u8]) -> u32 {
        lookup(&self.hasher, key, self.array_size, |bucket| {
            self.replacement(bucket).map(|replacement| (replacement.size, replacement.replacer))
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
        debug!(bucket, size = self.size(), array_size = self.array_size, "memento bucket added");
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
        ensure!(self.replacement(bucket).is_none(), BucketNotLiveSnafu { bucket });
        ensure!(self.size() > MIN_BUCKETS, LastBucketSnafu { bucket });

        if self.last_removed.is_none() && bucket == self.array_size - 1 {
            self.array_size -= 1;
        } else {
            self.remember(bucket);
        }
        debug!(bucket, size = self.size(), array_size = self.array_size, "memento bucket removed");
        Ok(bucket)
    }

    fn size(&self) -> u32 {
        self.array_size - self.removed
    }

    fn array_size(&self) -> u32 {
        self.array_size
    }

    fn is_working(&self, bucket: u32) -> bool {
        bucket < self.array_size && self.replacement(bucket).is_none()
    }
}
