//! Engine configuration
//!
//! Selects the engine algorithm, the key hash function and the initial bucket
//! count, from serde sources (JSON, TOML, ...) or from environment variables.
//! Missing fields fall back to defaults.

use std::env;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use snafu::ensure;

use crate::constants::MAX_BUCKETS;
use crate::constants::MIN_BUCKETS;
use crate::engine::Algorithm;
use crate::engine::BucketEngine;
use crate::error::BucketError;
use crate::error::InvalidSizeSnafu;
use crate::error::Result;
use crate::hash::HashFunction;

/// Default values for configuration
mod defaults {
    use crate::constants::DEFAULT_BUCKETS;
    use crate::engine::Algorithm;
    use crate::hash::HashFunction;

    pub fn algorithm() -> Algorithm { Algorithm::default() }
    pub fn hash_function() -> HashFunction { HashFunction::default() }
    pub fn initial_size() -> u32 { DEFAULT_BUCKETS }
}

/// Environment variable selecting the algorithm by name.
pub const ENV_ALGORITHM: &str = "BUCKET_ALGORITHM";
/// Environment variable selecting the hash function by name.
pub const ENV_HASH_FUNCTION: &str = "BUCKET_HASH_FUNCTION";
/// Environment variable holding the initial bucket count.
pub const ENV_INITIAL_SIZE: &str = "BUCKET_INITIAL_SIZE";

/// Which engine to build and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine algorithm.
    #[serde(default = "defaults::algorithm")]
    pub algorithm: Algorithm,
    /// Hash function applied to keys.
    #[serde(default = "defaults::hash_function")]
    pub hash_function: HashFunction,
    /// Working buckets of a freshly built engine.
    #[serde(default = "defaults::initial_size")]
    pub initial_size: u32,
}

impl EngineConfig {
    /// Configuration for `algorithm` with default hash function and size.
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    /// Set the hash function.
    pub fn with_hash_function(mut self, hash_function: HashFunction) -> Self {
        self.hash_function = hash_function;
        self
    }

    /// Set the initial bucket count.
    pub fn with_initial_size(mut self, initial_size: u32) -> Self {
        self.initial_size = initial_size;
        self
    }

    /// Load the configuration from environment variables, using defaults for
    /// unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load the configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let algorithm = match lookup(ENV_ALGORITHM) {
            Some(name) => Algorithm::from_str(name.trim())?,
            None => defaults::algorithm(),
        };
        let hash_function = match lookup(ENV_HASH_FUNCTION) {
            Some(name) => HashFunction::from_str(name.trim())?,
            None => defaults::hash_function(),
        };
        let initial_size = match lookup(ENV_INITIAL_SIZE) {
            Some(value) => value.trim().parse::<u32>().map_err(|e| BucketError::InvalidValue {
                key: ENV_INITIAL_SIZE.to_string(),
                value: value.clone(),
                reason: format!("must be an unsigned 32-bit integer: {}", e),
            })?,
            None => defaults::initial_size(),
        };

        let config = Self {
            algorithm,
            hash_function,
            initial_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can build an engine.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (MIN_BUCKETS..=MAX_BUCKETS).contains(&self.initial_size),
            InvalidSizeSnafu {
                size: self.initial_size,
                min: MIN_BUCKETS,
                max: MAX_BUCKETS
            }
        );
        Ok(())
    }

    /// Build an engine with `initial_size` working buckets.
    pub fn build(&self) -> Result<Box<dyn BucketEngine>> {
        self.build_with_size(self.initial_size)
    }

    /// Build an engine of the configured kind with `size` working buckets.
    pub fn build_with_size(&self, size: u32) -> Result<Box<dyn BucketEngine>> {
        self.algorithm.build(size, self.hash_function)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            algorithm: defaults::algorithm(),
            hash_function: defaults::hash_function(),
            initial_size: defaults::initial_size(),
        }
    }
}
