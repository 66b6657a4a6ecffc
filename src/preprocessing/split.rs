//! Stratified train/test split

use crate::error::{PrepError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Row positions of each partition in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Four aligned partitions
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
}

/// Seeded stratified splitter
#[derive(Debug, Clone)]
pub struct StratifiedSplitter {
    test_size: f64,
    random_state: u64,
}

impl Default for StratifiedSplitter {
    fn default() -> Self {
        Self {
            test_size: 0.30,
            random_state: 42,
        }
    }
}

impl StratifiedSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of rows reserved for test
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Partition row positions so each class keeps its proportion in both
    /// sides. The test side holds `ceil(test_size * n)` rows.
    pub fn split_indices(&self, y: &Array1<i64>) -> Result<SplitIndices> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PrepError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }

        let n = y.len();
        let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &code) in y.iter().enumerate() {
            by_class.entry(code).or_default().push(idx);
        }

        if let Some((&code, members)) = by_class.iter().find(|(_, m)| m.len() < 2) {
            return Err(PrepError::DataError(format!(
                "class {} has {} member(s), stratified splitting needs at least 2",
                code,
                members.len()
            )));
        }

        let n_test = (self.test_size * n as f64).ceil() as usize;
        let n_train = n.saturating_sub(n_test);
        let n_classes = by_class.len();
        if n_train < n_classes || n_test < n_classes {
            return Err(PrepError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: format!(
                    "train ({}) and test ({}) sizes must each be at least the number of classes ({})",
                    n_train, n_test, n_classes
                ),
            });
        }

        let counts: Vec<usize> = by_class.values().map(Vec::len).collect();
        let train_counts = allocate(&counts, n_train);

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut train = Vec::with_capacity(n_train);
        let mut test = Vec::with_capacity(n_test);
        for (mut members, n_class_train) in by_class.into_values().zip(train_counts) {
            members.shuffle(&mut rng);
            let (class_train, class_test) = members.split_at(n_class_train);
            train.extend_from_slice(class_train);
            test.extend_from_slice(class_test);
        }
        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        Ok(SplitIndices { train, test })
    }

    /// Split a feature matrix and its labels
    pub fn split(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<SplitResult> {
        if x.nrows() != y.len() {
            return Err(PrepError::ShapeError {
                expected: format!("{} label rows", x.nrows()),
                actual: format!("{} label rows", y.len()),
            });
        }

        let indices = self.split_indices(y)?;
        Ok(SplitResult {
            x_train: x.select(Axis(0), &indices.train),
            x_test: x.select(Axis(0), &indices.test),
            y_train: y.select(Axis(0), &indices.train),
            y_test: y.select(Axis(0), &indices.test),
        })
    }
}

/// Per-class train counts: proportional shares moved just enough that every
/// class keeps at least one row on each side.
/// Needs every count >= 2 and `counts.len() <= total <= sum - counts.len()`.
fn allocate(counts: &[usize], total: usize) -> Vec<usize> {
    let mut shares = proportional(counts, total);

    for i in 0..shares.len() {
        if shares[i] == 0 {
            // Take the row from the class with the most train rows to spare
            let donor = (0..shares.len())
                .filter(|&j| shares[j] > 1)
                .max_by(|&a, &b| shares[a].cmp(&shares[b]).then(b.cmp(&a)));
            if let Some(j) = donor {
                shares[j] -= 1;
                shares[i] += 1;
            }
        } else if shares[i] == counts[i] {
            // Give the row to the class with the most test rows to spare
            let receiver = (0..shares.len())
                .filter(|&j| counts[j] - shares[j] > 1)
                .max_by(|&a, &b| {
                    (counts[a] - shares[a]).cmp(&(counts[b] - shares[b])).then(b.cmp(&a))
                });
            if let Some(j) = receiver {
                shares[j] += 1;
                shares[i] -= 1;
            }
        }
    }
    shares
}

/// Distribute `total` draws over classes proportionally to `counts`:
/// floor shares first, then the largest remainders, ties to the lower code
fn proportional(counts: &[usize], total: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    let mut shares: Vec<usize> = counts.iter().map(|&c| c * total / n).collect();

    let mut remainders: Vec<(usize, usize)> = counts
        .iter()
        .enumerate()
        .map(|(i, &c)| ((c * total) % n, i))
        .collect();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let left = total - shares.iter().sum::<usize>();
    for &(_, i) in remainders.iter().take(left) {
        shares[i] += 1;
    }
    shares
}
