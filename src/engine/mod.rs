//! Bucket engines: consistent hashing over a dense integer range.
//!
//! Every engine maps keys onto buckets `[0, array_size)` and supports growing
//! and shrinking that range while moving as few keys as possible.
//!
//! | Engine | Removal | Memory |
//! |--------|---------|--------|
//! | [`JumpEngine`] | top bucket only (LIFO) | none |
//! | [`BinomialEngine`] | top bucket only (LIFO) | none |
//! | [`MementoEngine`] | any working bucket | one table, O(removed) |
//! | [`RecallEngine`] | any working bucket | two tables, O(removed) |
//!
//! Engines are picked by name through [`Algorithm`], an explicit table of
//! constructors.

mod binomial;
mod jump;
mod memento;
mod recall;

use std::fmt;
use std::str::FromStr;

pub use binomial::BinomialEngine;
pub use jump::JumpEngine;
pub use memento::MementoEngine;
pub use recall::RecallEngine;
use serde::Deserialize;
use serde::Serialize;
use snafu::ensure;

use crate::constants::MAX_BUCKETS;
use crate::constants::MIN_BUCKETS;
use crate::error::BucketError;
use crate::error::BucketOutOfRangeSnafu;
use crate::error::CapacityExhaustedSnafu;
use crate::error::InvalidSizeSnafu;
use crate::error::LastBucketSnafu;
use crate::error::NotTopBucketSnafu;
use crate::error::Result;
use crate::hash::HashFunction;

/// A consistent hash over the dense bucket range `[0, array_size)`.
///
/// Engines are single-threaded: mutation needs `&mut self`, and callers sharing
/// an engine must serialize access themselves.
pub trait BucketEngine: fmt::Debug + Send {
    /// Bucket owning `key`. Always a working bucket.
    fn get_bucket(&self, key: &[u8]) -> u32;

    /// Add a bucket and return its index.
    fn add_bucket(&mut self) -> Result<u32>;

    /// Remove `bucket` and return it.
    fn remove_bucket(&mut self, bucket: u32) -> Result<u32>;

    /// Number of working buckets.
    fn size(&self) -> u32;

    /// Highest bucket index in use plus one, including removed buckets still
    /// reachable through redirection.
    fn array_size(&self) -> u32;

    /// Whether `bucket` is currently a working bucket.
    fn is_working(&self, bucket: u32) -> bool {
        bucket < self.size()
    }
}

/// Registered engine algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Jump consistent hash, LIFO resizing only.
    Jump,
    /// Binomial hash, LIFO resizing only.
    Binomial,
    /// Memento hash with a single replacement table.
    #[default]
    Memento,
    /// Memento hash with separate replacement and reverse-pointer tables.
    Recall,
}

impl Algorithm {
    /// All registered algorithms.
    pub const ALL: [Algorithm; 4] = [Algorithm::Jump, Algorithm::Binomial, Algorithm::Memento, Algorithm::Recall];

    /// Canonical name of the algorithm.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Jump => "jump",
            Algorithm::Binomial => "binomial",
            Algorithm::Memento => "memento",
            Algorithm::Recall => "recall",
        }
    }

    /// Whether engines of this algorithm accept removal of any working bucket.
    pub fn supports_arbitrary_removal(self) -> bool {
        matches!(self, Algorithm::Memento | Algorithm::Recall)
    }

    /// Construct an engine of this algorithm with `size` working buckets.
    pub fn build(self, size: u32, hash_function: HashFunction) -> Result<Box<dyn BucketEngine>> {
        Ok(match self {
            Algorithm::Jump => Box::new(JumpEngine::new(size, hash_function)?),
            Algorithm::Binomial => Box::new(BinomialEngine::new(size, hash_function)?),
            Algorithm::Memento => Box::new(MementoEngine::new(size, hash_function)?),
            Algorithm::Recall => Box::new(RecallEngine::new(size, hash_function)?),
        })
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = BucketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| BucketError::UnknownAlgorithm { name: s.to_string() })
    }
}

/// Reject engine sizes outside `MIN_BUCKETS..=MAX_BUCKETS`.
pub(crate) fn check_size(size: u32) -> Result<()> {
    ensure!(
        (MIN_BUCKETS..=MAX_BUCKETS).contains(&size),
        InvalidSizeSnafu {
            size,
            min: MIN_BUCKETS,
            max: MAX_BUCKETS
        }
    );
    Ok(())
}

/// Reject growing an array that already spans `MAX_BUCKETS`.
pub(crate) fn check_growable(array_size: u32) -> Result<()> {
    ensure!(array_size < MAX_BUCKETS, CapacityExhaustedSnafu { max: MAX_BUCKETS });
    Ok(())
}

/// Preconditions shared by the LIFO engines: only the top bucket may go, and
/// one bucket must remain.
pub(crate) fn check_lifo_removal(bucket: u32, size: u32) -> Result<()> {
    ensure!(bucket < size, BucketOutOfRangeSnafu { bucket, array_size: size });
    ensure!(bucket == size - 1, NotTopBucketSnafu { bucket, top: size - 1 });
    ensure!(size > MIN_BUCKETS, LastBucketSnafu { bucket });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.name().parse::<Algorithm>().unwrap(), algorithm);
        }
        assert_eq!("Memento".parse::<Algorithm>().unwrap(), Algorithm::Memento);
        assert_eq!("ring".parse::<Algorithm>(), Err(BucketError::UnknownAlgorithm { name: "ring".to_string() }));
    }

    #[test]
    fn test_build_every_algorithm() {
        for algorithm in Algorithm::ALL {
            let engine = algorithm.build(12, HashFunction::default()).unwrap();
            assert_eq!(engine.size(), 12, "{algorithm}");
            assert_eq!(engine.array_size(), 12, "{algorithm}");
            assert!(engine.get_bucket(b"key") < 12);
        }
    }

    #[test]
    fn test_build_rejects_invalid_sizes() {
        for algorithm in Algorithm::ALL {
            assert!(matches!(algorithm.build(0, HashFunction::Sip), Err(BucketError::InvalidSize { size: 0, .. })));
            assert!(matches!(algorithm.build(MAX_BUCKETS + 1, HashFunction::Sip), Err(BucketError::InvalidSize { .. })));
        }
    }

    #[test]
    fn test_arbitrary_removal_support() {
        assert!(!Algorithm::Jump.supports_arbitrary_removal());
        assert!(!Algorithm::Binomial.supports_arbitrary_removal());
        assert!(Algorithm::Memento.supports_arbitrary_removal());
        assert!(Algorithm::Recall.supports_arbitrary_removal());
    }

    #[test]
    fn test_lifo_removal_checks() {
        assert!(check_lifo_removal(4, 5).is_ok());
        assert_eq!(check_lifo_removal(2, 5), Err(BucketError::NotTopBucket { bucket: 2, top: 4 }));
        assert_eq!(check_lifo_removal(5, 5), Err(BucketError::BucketOutOfRange { bucket: 5, array_size: 5 }));
        assert_eq!(check_lifo_removal(0, 1), Err(BucketError::LastBucket { bucket: 0 }));
    }
}
