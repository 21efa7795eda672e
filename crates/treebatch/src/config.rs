//! Loader configuration with builder pattern.
//!
//! [`LoaderConfig`] collects everything the mini-batch loader needs. It uses
//! the `bon` crate for builder generation and validates at build time.
//!
//! # Example
//!
//! ```
//! use treebatch::config::{BatchMode, LoaderConfig};
//!
//! // All defaults: tree batching, 100 jets per batch
//! let config = LoaderConfig::builder().build().unwrap();
//! assert_eq!(config.batch_size, 100);
//!
//! // Constituent batching with particle dropout
//! let config = LoaderConfig::builder()
//!     .mode(BatchMode::Leaves)
//!     .batch_size(64)
//!     .dropout(0.1)
//!     .permute_particles(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.mode, BatchMode::Leaves);
//! ```

use bon::Builder;

// =============================================================================
// Verbosity
// =============================================================================

/// How much the loader reports through `tracing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    #[default]
    Silent,
    Warning,
    Info,
    Debug,
}

// =============================================================================
// BatchMode
// =============================================================================

/// What a mini-batch carries to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BatchMode {
    /// Level-synchronized tree layout ([`crate::layout::TreeBatch`]).
    #[default]
    Trees,
    /// Padded constituent sets with a pairwise mask.
    Leaves,
}

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("batch_size must be at least 1")]
    InvalidBatchSize,

    #[error("dropout must be in [0, 1), got {0}")]
    InvalidDropout(f32),

    #[error("prefetch depth must be at least 1")]
    InvalidPrefetch,
}

// =============================================================================
// LoaderConfig
// =============================================================================

/// Configuration for [`crate::data::JetLoader`].
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct LoaderConfig {
    /// Samples per mini-batch. Default: 100.
    #[builder(default = 100)]
    pub batch_size: usize,

    /// Tree or constituent batching. Default: `Trees`.
    #[builder(default)]
    pub mode: BatchMode,

    /// Per-particle drop probability in leaves mode. `None` disables dropout.
    pub dropout: Option<f32>,

    /// Shuffle constituent order within each jet in leaves mode.
    #[builder(default)]
    pub permute_particles: bool,

    /// Carry per-sample weights in each batch.
    #[builder(default)]
    pub weight_batches: bool,

    /// Shuffle sample order at the start of each epoch.
    #[builder(default)]
    pub shuffle: bool,

    /// Drop the final batch if it is shorter than `batch_size`.
    #[builder(default)]
    pub drop_last: bool,

    /// Random seed for shuffling, permutation and dropout. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    /// Worker threads for batch layout. 0 = auto, 1 = sequential.
    #[builder(default)]
    pub n_threads: usize,

    /// Batches the prefetcher may hold ahead of the consumer. Default: 2.
    #[builder(default = 2)]
    pub prefetch: usize,

    /// Loader reporting level. Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: loader_config_builder::IsComplete> LoaderConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `batch_size == 0`, `prefetch == 0`, or
    /// dropout lies outside `[0, 1)`.
    pub fn build(self) -> Result<LoaderConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl LoaderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if self.prefetch == 0 {
            return Err(ConfigError::InvalidPrefetch);
        }
        if let Some(p) = self.dropout {
            if !(0.0..1.0).contains(&p) {
                return Err(ConfigError::InvalidDropout(p));
            }
        }
        Ok(())
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            mode: BatchMode::Trees,
            dropout: None,
            permute_particles: false,
            weight_batches: false,
            shuffle: false,
            drop_last: false,
            seed: 42,
            n_threads: 0,
            prefetch: 2,
            verbosity: Verbosity::Silent,
        }
    }
}
