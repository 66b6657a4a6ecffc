//! SMOTE with per-class absolute targets

use crate::error::{PrepError, Result};
use crate::synthetic::{class_counts, class_indices, ResampleResult, Sampler, SamplingStrategy};
use ndarray::{concatenate, Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};
use tracing::{debug, info};

/// Squared distance and row position, ordered by distance then position
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// SMOTE (Synthetic Minority Over-sampling Technique)
#[derive(Debug, Clone)]
pub struct SMOTE {
    /// Number of nearest same-class neighbors
    k_neighbors: usize,
    /// Target count per class
    strategy: SamplingStrategy,
    /// Random seed
    seed: u64,
    /// Resolved final count per class
    target_counts: Option<BTreeMap<i64, usize>>,
}

impl SMOTE {
    /// Create a sampler for the given targets
    pub fn new(strategy: SamplingStrategy) -> Self {
        Self {
            k_neighbors: 1,
            strategy,
            seed: 42,
            target_counts: None,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Resolved targets, available after [`Sampler::fit`]
    pub fn target_counts(&self) -> Option<&BTreeMap<i64, usize>> {
        self.target_counts.as_ref()
    }

    fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).powi(2)).sum()
    }

    /// The `k` nearest members to `members[src]`, nearest first, excluding
    /// `src` itself
    fn find_neighbors(x: &Array2<f64>, members: &[usize], src: usize, k: usize) -> Vec<usize> {
        let point = x.row(members[src]);
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);

        for (i, &row) in members.iter().enumerate() {
            if i == src {
                continue;
            }
            let candidate = DistIdx(Self::squared_distance(point, x.row(row)), i);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(&worst) = heap.peek() {
                if candidate < worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        heap.into_sorted_vec().into_iter().map(|DistIdx(_, i)| i).collect()
    }

    /// Synthesize `n` samples for one class from its member rows
    fn synthesize_class(
        &self,
        x: &Array2<f64>,
        members: &[usize],
        n: usize,
        rng: &mut ChaCha8Rng,
    ) -> Vec<f64> {
        let k = self.k_neighbors;

        let draws: Vec<(usize, usize, f64)> = (0..n)
            .map(|_| {
                let src = rng.gen_range(0..members.len());
                let slot = rng.gen_range(0..k);
                let gap: f64 = rng.gen();
                (src, slot, gap)
            })
            .collect();

        let sources: BTreeSet<usize> = draws.iter().map(|&(src, _, _)| src).collect();
        let neighbors: HashMap<usize, Vec<usize>> = sources
            .into_par_iter()
            .map(|src| (src, Self::find_neighbors(x, members, src, k)))
            .collect();

        let mut out = Vec::with_capacity(n * x.ncols());
        for (src, slot, gap) in draws {
            let point = x.row(members[src]);
            let neighbor = x.row(members[neighbors[&src][slot]]);
            out.extend(
                point
                    .iter()
                    .zip(neighbor.iter())
                    .map(|(&p, &q)| p + gap * (q - p)),
            );
        }
        out
    }
}

impl Sampler for SMOTE {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(PrepError::ShapeError {
                expected: format!("{} label rows", x.nrows()),
                actual: format!("{} label rows", y.len()),
            });
        }

        let counts = class_counts(y);
        let targets = self.strategy.resolve(&counts)?;

        let required = self.k_neighbors + 1;
        for (&class, &target) in &targets {
            let members = counts[&class];
            if target > members && members < required {
                return Err(PrepError::ClassTooSmall {
                    class,
                    label: self.strategy.display_name(class),
                    members,
                    required,
                });
            }
        }

        self.target_counts = Some(targets);
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        let targets = self.target_counts.as_ref().ok_or(PrepError::ModelNotFitted)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let indices = class_indices(y);
        let n_features = x.ncols();

        let mut synthetic_x: Vec<f64> = Vec::new();
        let mut synthetic_y: Vec<i64> = Vec::new();
        let mut n_synthetic = BTreeMap::new();

        for (&class, &target) in targets {
            let members = indices.get(&class).map(Vec::as_slice).unwrap_or(&[]);
            let n_to_generate = target.saturating_sub(members.len());
            n_synthetic.insert(class, n_to_generate);
            if n_to_generate == 0 {
                continue;
            }
            if members.len() <= self.k_neighbors {
                return Err(PrepError::ClassTooSmall {
                    class,
                    label: self.strategy.display_name(class),
                    members: members.len(),
                    required: self.k_neighbors + 1,
                });
            }

            debug!(
                class,
                label = %self.strategy.display_name(class),
                current = members.len(),
                target,
                generating = n_to_generate,
                "Synthesizing class"
            );
            synthetic_x.extend(self.synthesize_class(x, members, n_to_generate, &mut rng));
            synthetic_y.extend(std::iter::repeat(class).take(n_to_generate));
        }

        let n_new = synthetic_y.len();
        info!(synthetic = n_new, "SMOTE resampling complete");

        let synthetic = Array2::from_shape_vec((n_new, n_features), synthetic_x)?;
        let result_x = concatenate(Axis(0), &[x.view(), synthetic.view()])?;

        let mut all_y: Vec<i64> = y.to_vec();
        all_y.extend_from_slice(&synthetic_y);

        Ok(ResampleResult {
            x: result_x,
            y: Array1::from_vec(all_y),
            n_synthetic,
        })
    }
}
