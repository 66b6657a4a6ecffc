//! Class balancing by synthetic oversampling
//!
//! Minority classes of the training partition are grown to explicit
//! per-class targets with SMOTE. Targets come from a [`SamplingStrategy`]
//! that must account for every class observed in the training labels.

mod smote;

pub use smote::SMOTE;

use crate::error::{PrepError, Result};
use crate::preprocessing::{ClassDictionary, ClassTarget};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handling of training classes absent from the sampling strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedClassPolicy {
    /// Fail with [`PrepError::UnmappedClass`]
    #[default]
    Reject,
    /// Leave the class at its current count
    Keep,
}

/// Target training count per class code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingStrategy {
    targets: BTreeMap<i64, usize>,
    unmapped: UnmappedClassPolicy,
    /// Names used in diagnostics
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<i64, String>,
}

impl SamplingStrategy {
    pub fn new(targets: BTreeMap<i64, usize>) -> Self {
        Self {
            targets,
            unmapped: UnmappedClassPolicy::Reject,
            labels: BTreeMap::new(),
        }
    }

    /// Build from configured targets, checking any expected class names
    /// against the dictionary
    pub fn from_targets(entries: &[ClassTarget], dictionary: &ClassDictionary) -> Result<Self> {
        let mut targets = BTreeMap::new();
        for entry in entries {
            if let Some(expected) = &entry.label {
                match dictionary.decode(entry.code) {
                    Some(actual) if actual == expected => {}
                    Some(actual) => {
                        return Err(PrepError::ValidationError(format!(
                            "sampling target for class {} expects '{}', but the class dictionary maps it to '{}'",
                            entry.code, expected, actual
                        )))
                    }
                    None => {
                        return Err(PrepError::ValidationError(format!(
                            "sampling target for class {} expects '{}', but the class dictionary has only {} classes",
                            entry.code,
                            expected,
                            dictionary.len()
                        )))
                    }
                }
            }
            targets.insert(entry.code, entry.target);
        }

        let labels = dictionary
            .iter()
            .map(|(code, name)| (code, name.to_string()))
            .collect();
        Ok(Self {
            targets,
            unmapped: UnmappedClassPolicy::Reject,
            labels,
        })
    }

    pub fn with_unmapped(mut self, policy: UnmappedClassPolicy) -> Self {
        self.unmapped = policy;
        self
    }

    pub fn targets(&self) -> &BTreeMap<i64, usize> {
        &self.targets
    }

    pub fn target(&self, class: i64) -> Option<usize> {
        self.targets.get(&class).copied()
    }

    pub fn display_name(&self, class: i64) -> String {
        self.labels
            .get(&class)
            .cloned()
            .unwrap_or_else(|| format!("class {}", class))
    }

    /// Final count for every observed class
    pub fn resolve(&self, counts: &BTreeMap<i64, usize>) -> Result<BTreeMap<i64, usize>> {
        if let Some(&class) = self.targets.keys().find(|c| !counts.contains_key(c)) {
            return Err(PrepError::UnknownClass(class));
        }

        let mut resolved = BTreeMap::new();
        for (&class, &current) in counts {
            let target = match (self.target(class), self.unmapped) {
                (Some(target), _) if target < current => {
                    return Err(PrepError::TargetBelowCount {
                        class,
                        target,
                        current,
                    })
                }
                (Some(target), _) => target,
                (None, UnmappedClassPolicy::Keep) => current,
                (None, UnmappedClassPolicy::Reject) => {
                    return Err(PrepError::UnmappedClass {
                        class,
                        label: self.display_name(class),
                    })
                }
            };
            resolved.insert(class, target);
        }
        Ok(resolved)
    }
}

/// Result of resampling
#[derive(Debug, Clone)]
pub struct ResampleResult {
    /// Resampled features
    pub x: Array2<f64>,
    /// Resampled labels
    pub y: Array1<i64>,
    /// Number of synthetic samples generated per class
    pub n_synthetic: BTreeMap<i64, usize>,
}

/// Trait for samplers
pub trait Sampler: Send + Sync {
    /// Fit the sampler on data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()>;

    /// Resample data
    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult>;

    /// Fit and resample in one step
    fn fit_resample(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        self.fit(x, y)?;
        self.resample(x, y)
    }
}

/// Get class distribution
pub fn class_counts(y: &Array1<i64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in y.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Get indices for each class
pub fn class_indices(y: &Array1<i64>) -> BTreeMap<i64, Vec<usize>> {
    let mut indices = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_insert_with(Vec::new).push(i);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary() -> ClassDictionary {
        ClassDictionary::from_names(vec!["BENIGN".into(), "Bot".into(), "DDoS".into()]).unwrap()
    }

    fn counts() -> BTreeMap<i64, usize> {
        BTreeMap::from([(0, 50), (1, 3), (2, 10)])
    }

    #[test]
    fn test_resolve_total_strategy() {
        let strategy = SamplingStrategy::new(BTreeMap::from([(0, 50), (1, 20), (2, 10)]));
        let resolved = strategy.resolve(&counts()).unwrap();
        assert_eq!(resolved, BTreeMap::from([(0, 50), (1, 20), (2, 10)]));
    }

    #[test]
    fn test_unmapped_class_policies() {
        let partial = BTreeMap::from([(0, 50), (1, 20)]);

        match SamplingStrategy::from_targets(
            &[ClassTarget::new(0, 50), ClassTarget::new(1, 20)],
            &dictionary(),
        )
        .unwrap()
        .resolve(&counts())
        {
            Err(PrepError::UnmappedClass { class, label }) => {
                assert_eq!(class, 2);
                assert_eq!(label, "DDoS");
            }
            other => panic!("expected unmapped class, got {:?}", other),
        }

        let keep = SamplingStrategy::new(partial).with_unmapped(UnmappedClassPolicy::Keep);
        assert_eq!(keep.resolve(&counts()).unwrap()[&2], 10);
    }

    #[test]
    fn test_unknown_and_shrinking_targets() {
        let unknown = SamplingStrategy::new(BTreeMap::from([(0, 50), (1, 3), (2, 10), (7, 5)]));
        assert!(matches!(unknown.resolve(&counts()), Err(PrepError::UnknownClass(7))));

        let shrink = SamplingStrategy::new(BTreeMap::from([(0, 40), (1, 3), (2, 10)]));
        assert!(matches!(
            shrink.resolve(&counts()),
            Err(PrepError::TargetBelowCount { class: 0, target: 40, current: 50 })
        ));
    }

    #[test]
    fn test_label_mismatch_is_rejected() {
        let entries = [ClassTarget::labelled(1, 20, "DDoS")];
        assert!(matches!(
            SamplingStrategy::from_targets(&entries, &dictionary()),
            Err(PrepError::ValidationError(_))
        ));

        let entries = [ClassTarget::labelled(1, 20, "Bot")];
        assert!(SamplingStrategy::from_targets(&entries, &dictionary()).is_ok());
    }

    #[test]
    fn test_class_counts_and_indices() {
        let y = Array1::from(vec![2, 0, 2, 1]);
        assert_eq!(class_counts(&y), BTreeMap::from([(0, 1), (1, 1), (2, 2)]));
        assert_eq!(class_indices(&y)[&2], vec![0, 2]);
    }
}
