//! Parallelism configuration shared by the batching entry points.
//!
//! A single batch is always laid out sequentially. Parallelism only applies
//! across independent batches (see [`crate::layout::TreeBatcher::batch_many`]).

use rayon::prelude::*;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution across batches is allowed.
///
/// When `Parallel`, callers may use `rayon` parallel iterators; when
/// `Sequential`, they must iterate in order on the calling thread.
///
/// The thread pool itself is set up by [`run_with_threads`]; components only
/// respect this flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Parallelism {
    #[default]
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map over items, in parallel when allowed. Output order matches input order.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use the global rayon pool)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
///
/// # Errors
///
/// Returns the rayon error if a dedicated pool cannot be built.
///
/// # Example
///
/// ```
/// use treebatch::{run_with_threads, Parallelism};
///
/// let p = run_with_threads(1, |p| p).unwrap();
/// assert_eq!(p, Parallelism::Sequential);
/// ```
pub fn run_with_threads<T: Send>(
    n_threads: usize,
    f: impl FnOnce(Parallelism) -> T + Send,
) -> Result<T, rayon::ThreadPoolBuildError> {
    match (n_threads, Parallelism::from_threads(n_threads)) {
        (_, Parallelism::Sequential) => Ok(f(Parallelism::Sequential)),
        (0, Parallelism::Parallel) => Ok(f(Parallelism::Parallel)),
        (n, Parallelism::Parallel) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
            Ok(pool.install(|| f(Parallelism::Parallel)))
        }
    }
}
