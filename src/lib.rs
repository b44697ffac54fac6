//! Bucket-based consistent hashing.
//!
//! Keys are mapped onto a dense range of bucket indices `[0, n)` by a
//! [`BucketEngine`]; an [`Indirection`] binds those buckets to node identities,
//! and a [`BucketRouter`] keeps the two in lock-step.
//!
//! # Engines
//!
//! - [`JumpEngine`]: Jump consistent hash, LIFO resizing
//! - [`BinomialEngine`]: Binomial hash, LIFO resizing
//! - [`MementoEngine`]: Memento hash, arbitrary removals with O(removed) memory
//! - [`RecallEngine`]: Memento hash with a separate reverse-pointer table
//!
//! # Example
//!
//! ```
//! use aspen_bucket_hash::Algorithm;
//! use aspen_bucket_hash::BucketRouter;
//! use aspen_bucket_hash::EngineConfig;
//!
//! let nodes = vec!["alpha", "beta", "gamma"];
//! let mut router = BucketRouter::new(EngineConfig::new(Algorithm::Memento), nodes).unwrap();
//!
//! let owner = *router.get_node(b"user:42").unwrap();
//! router.remove_node(&"beta").unwrap();
//! if owner != "beta" {
//!     assert_eq!(*router.get_node(b"user:42").unwrap(), owner);
//! }
//! ```
//!
//! Engines are single-threaded and never log below `debug`. Install a
//! `tracing` subscriber to see structural changes.

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod hash;
pub mod indirection;
pub mod router;
pub mod table;

pub use config::EngineConfig;
pub use engine::Algorithm;
pub use engine::BinomialEngine;
pub use engine::BucketEngine;
pub use engine::JumpEngine;
pub use engine::MementoEngine;
pub use engine::RecallEngine;
pub use error::BucketError;
pub use error::Result;
pub use hash::HashFunction;
pub use hash::JumpHash;
pub use hash::KeyHasher;
pub use indirection::Indirection;
pub use router::BucketRouter;
