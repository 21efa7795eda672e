//! Mini-batch loader over an in-memory jet dataset.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::collate::{collate, Batch};
use super::jet::Sample;
use super::prefetch::Prefetcher;
use crate::config::{BatchMode, LoaderConfig, Verbosity};
use crate::error::BatchError;
use crate::repr::TreeView;
use crate::utils::run_with_threads;

/// Splits a dataset into collated mini-batches.
///
/// Cloning is cheap: the samples are shared.
///
/// Randomness is derived from `(seed, epoch, batch index)`, so an epoch
/// yields the same batches whether it is iterated, collected in parallel, or
/// prefetched.
#[derive(Debug, Clone)]
pub struct JetLoader {
    samples: Arc<[Sample]>,
    config: LoaderConfig,
}

impl JetLoader {
    pub fn new(samples: impl Into<Arc<[Sample]>>, config: LoaderConfig) -> Self {
        let samples = samples.into();
        if config.verbosity >= Verbosity::Info {
            if config.weight_batches {
                tracing::info!("using per-sample weights to flatten the pt spectrum");
            } else {
                tracing::info!("unweighted samples");
            }
            tracing::info!(
                n_samples = samples.len(),
                batch_size = config.batch_size,
                mode = ?config.mode,
                "loader ready"
            );
        }
        Self { samples, config }
    }

    #[inline]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Number of batches per epoch.
    pub fn len(&self) -> usize {
        let n = self.samples.len();
        let b = self.config.batch_size;
        if self.config.drop_last {
            n / b
        } else {
            n.div_ceil(b)
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Input width seen by the model: node features in tree mode, particle
    /// features plus the realness channel in leaves mode.
    pub fn dim(&self) -> Option<usize> {
        let first = self.samples.first()?;
        Some(match self.config.mode {
            BatchMode::Trees => first.jet.n_features(),
            BatchMode::Leaves => first.jet.constituents.ncols() + 1,
        })
    }

    /// Sample indices of each batch in `epoch`.
    pub fn batch_indices(&self, epoch: u64) -> Vec<Vec<usize>> {
        let mut order: Vec<usize> = (0..self.samples.len()).collect();
        if self.config.shuffle {
            let mut rng = StdRng::seed_from_u64(mix_seed(self.config.seed, epoch, u64::MAX));
            order.shuffle(&mut rng);
        }

        let batch_size = self.config.batch_size;
        order
            .chunks(batch_size)
            .filter(|chunk| !self.config.drop_last || chunk.len() == batch_size)
            .map(<[usize]>::to_vec)
            .collect()
    }

    /// Collate one batch of `epoch`.
    pub fn load_batch(&self, epoch: u64, batch: usize, indices: &[usize]) -> Result<Batch, BatchError> {
        let selected: Vec<&Sample> = indices
            .iter()
            .map(|&i| {
                self.samples.get(i).ok_or_else(|| {
                    BatchError::Inconsistent(format!(
                        "sample index {i} out of range for {} samples",
                        self.samples.len()
                    ))
                })
            })
            .collect::<Result<_, _>>()?;
        let mut rng = StdRng::seed_from_u64(mix_seed(self.config.seed, epoch, batch as u64));
        let result = collate(&selected, &self.config, &mut rng);

        if let Err(e) = &result {
            if self.config.verbosity >= Verbosity::Warning {
                tracing::warn!(epoch, batch, error = %e, "batch layout failed");
            }
        }
        result
    }

    /// Iterate the batches of `epoch` on the calling thread.
    pub fn iter_epoch(&self, epoch: u64) -> EpochIter<'_> {
        EpochIter {
            loader: self,
            epoch,
            batches: self.batch_indices(epoch),
            next: 0,
        }
    }

    /// Collate every batch of `epoch`, spreading batches over `n_threads`.
    ///
    /// # Errors
    ///
    /// Fails only if a dedicated thread pool cannot be built; per-batch
    /// failures are returned in place.
    pub fn collect_epoch(
        &self,
        epoch: u64,
    ) -> Result<Vec<Result<Batch, BatchError>>, rayon::ThreadPoolBuildError> {
        let jobs: Vec<(usize, Vec<usize>)> = self.batch_indices(epoch).into_iter().enumerate().collect();
        run_with_threads(self.config.n_threads, |parallelism| {
            parallelism.maybe_par_map(jobs, |(batch, indices)| {
                self.load_batch(epoch, batch, &indices)
            })
        })
    }

    /// Collate `epoch` on a background thread, at most `prefetch` batches ahead.
    pub fn prefetch(&self, epoch: u64) -> Prefetcher {
        Prefetcher::spawn(self.clone(), epoch)
    }
}

/// Sequential iterator over one epoch.
#[derive(Debug)]
pub struct EpochIter<'a> {
    loader: &'a JetLoader,
    epoch: u64,
    batches: Vec<Vec<usize>>,
    next: usize,
}

impl Iterator for EpochIter<'_> {
    type Item = Result<Batch, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.batches.get(self.next)?;
        let batch = self.next;
        self.next += 1;
        Some(self.loader.load_batch(self.epoch, batch, indices))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.batches.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for EpochIter<'_> {}

/// SplitMix64 finalizer over the seed and two stream ids.
fn mix_seed(seed: u64, epoch: u64, stream: u64) -> u64 {
    let mut z = seed
        ^ epoch.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ stream.wrapping_mul(0xD1B5_4A32_D192_ED03);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
