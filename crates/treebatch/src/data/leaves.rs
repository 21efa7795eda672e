//! Constituent ("leaves") batching.
//!
//! Each jet's particle set is optionally shuffled and thinned, then all sets
//! are padded to the longest one. Padded input carries one extra channel that
//! is `1.0` on real particles and `0.0` on padding, and a pairwise mask marks
//! which particle pairs are both real.

use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::BatchError;

/// Padded constituent batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedLeaves {
    /// `[batch, max_particles, n_features + 1]`, last channel = realness.
    pub data: Array3<f32>,
    /// `[batch, max_particles, max_particles]`, 1.0 where both particles are real.
    pub mask: Array3<f32>,
    /// Real particle count per jet.
    pub lengths: Vec<usize>,
}

impl PaddedLeaves {
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    #[inline]
    pub fn max_particles(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// Width of each padded particle row, including the realness channel.
    #[inline]
    pub fn dim(&self) -> usize {
        self.data.len_of(Axis(2))
    }
}

/// Shuffle the particle order of one jet.
pub fn permute_particles<R: Rng + ?Sized>(particles: ArrayView2<'_, f32>, rng: &mut R) -> Array2<f32> {
    let mut order: Vec<usize> = (0..particles.nrows()).collect();
    order.shuffle(rng);
    particles.select(Axis(0), &order)
}

/// Drop each particle independently with probability `p`.
///
/// At least one particle survives whenever the input is non-empty.
pub fn drop_particles<R: Rng + ?Sized>(
    particles: ArrayView2<'_, f32>,
    p: f32,
    rng: &mut R,
) -> Array2<f32> {
    let n = particles.nrows();
    if n == 0 || p <= 0.0 {
        return particles.to_owned();
    }
    let p = f64::from(p.min(1.0));
    let mut keep: Vec<usize> = (0..n).filter(|_| !rng.gen_bool(p)).collect();
    if keep.is_empty() {
        keep.push(rng.gen_range(0..n));
    }
    particles.select(Axis(0), &keep)
}

/// Pad particle sets to a common length with a realness channel and mask.
///
/// # Errors
///
/// Returns [`BatchError::EmptyBatch`] for no jets, and
/// [`BatchError::Inconsistent`] when particle widths differ.
pub fn pad_with_extra_channel(jets: &[Array2<f32>]) -> Result<PaddedLeaves, BatchError> {
    let first = jets.first().ok_or(BatchError::EmptyBatch)?;
    let n_features = first.ncols();
    if let Some((i, bad)) = jets.iter().enumerate().find(|(_, j)| j.ncols() != n_features) {
        return Err(BatchError::Inconsistent(format!(
            "jet {i} has {} features, expected {n_features}",
            bad.ncols()
        )));
    }

    let lengths: Vec<usize> = jets.iter().map(|j| j.nrows()).collect();
    let max_len = lengths.iter().copied().max().unwrap_or(0);
    let mut data = Array3::<f32>::zeros((jets.len(), max_len, n_features + 1));
    let mut mask = Array3::<f32>::zeros((jets.len(), max_len, max_len));

    for (b, (jet, &len)) in jets.iter().zip(&lengths).enumerate() {
        data.slice_mut(s![b, ..len, ..n_features]).assign(jet);
        data.slice_mut(s![b, ..len, n_features]).fill(1.0);
        mask.slice_mut(s![b, ..len, ..len]).fill(1.0);
    }

    Ok(PaddedLeaves {
        data,
        mask,
        lengths,
    })
}

/// Options applied to each jet before padding.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeafOptions {
    pub permute: bool,
    pub dropout: Option<f32>,
}

/// Permute, thin and pad a batch of particle sets.
pub fn batch_leaves<'a, R, I>(jets: I, options: LeafOptions, rng: &mut R) -> Result<PaddedLeaves, BatchError>
where
    R: Rng + ?Sized,
    I: IntoIterator<Item = ArrayView2<'a, f32>>,
{
    let prepared: Vec<Array2<f32>> = jets
        .into_iter()
        .map(|particles| {
            let particles = if options.permute {
                permute_particles(particles, rng)
            } else {
                particles.to_owned()
            };
            match options.dropout {
                Some(p) => drop_particles(particles.view(), p, rng),
                None => particles,
            }
        })
        .collect();
    pad_with_extra_channel(&prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn padding_adds_realness_channel_and_mask() {
        let a = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let b = array![[7.0, 8.0]];
        let padded = pad_with_extra_channel(&[a, b]).unwrap();

        assert_eq!(padded.data.shape(), &[2, 3, 3]);
        assert_eq!(padded.mask.shape(), &[2, 3, 3]);
        assert_eq!(padded.lengths, vec![3, 1]);
        assert_eq!(padded.dim(), 3);

        assert_eq!(padded.data.slice(s![0, 2, ..]).to_vec(), vec![5.0, 6.0, 1.0]);
        assert_eq!(padded.data.slice(s![1, 0, ..]).to_vec(), vec![7.0, 8.0, 1.0]);
        assert_eq!(padded.data.slice(s![1, 1, ..]).to_vec(), vec![0.0, 0.0, 0.0]);

        assert_eq!(padded.mask.slice(s![0, .., ..]).sum(), 9.0);
        assert_eq!(padded.mask.slice(s![1, .., ..]).sum(), 1.0);
        assert_eq!(padded.mask[[1, 0, 0]], 1.0);
        assert_eq!(padded.mask[[1, 0, 1]], 0.0);
    }

    #[test]
    fn padding_rejects_mixed_widths() {
        let a = array![[1.0, 2.0]];
        let b = array![[1.0]];
        assert!(matches!(pad_with_extra_channel(&[a, b]), Err(BatchError::Inconsistent(_))));
    }

    #[test]
    fn padding_empty_batch() {
        assert_eq!(pad_with_extra_channel(&[]), Err(BatchError::EmptyBatch));
    }

    #[test]
    fn permutation_keeps_the_particle_set() {
        let particles = Array2::from_shape_fn((20, 1), |(i, _)| i as f32);
        let mut rng = StdRng::seed_from_u64(7);
        let permuted = permute_particles(particles.view(), &mut rng);

        let mut values = permuted.column(0).to_vec();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(values, particles.column(0).to_vec());
    }

    #[test]
    fn dropout_keeps_at_least_one_particle() {
        let particles = array![[1.0], [2.0], [3.0]];
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..50 {
            let kept = drop_particles(particles.view(), 0.999, &mut rng);
            assert!(kept.nrows() >= 1);
        }
    }

    #[test]
    fn dropout_zero_is_identity() {
        let particles = array![[1.0], [2.0], [3.0]];
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(drop_particles(particles.view(), 0.0, &mut rng), particles);
    }

    #[test]
    fn batch_leaves_is_seeded() {
        let jets = [
            Array2::from_shape_fn((8, 2), |(i, j)| (i * 2 + j) as f32),
            Array2::from_shape_fn((5, 2), |(i, j)| (i * 3 + j) as f32),
        ];
        let options = LeafOptions {
            permute: true,
            dropout: Some(0.3),
        };
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            batch_leaves(jets.iter().map(|j| j.view()), options, &mut rng).unwrap()
        };
        assert_eq!(run(3), run(3));
        assert_eq!(run(3).batch_size(), 2);
    }
}
