//! Z-score feature scaling
//!
//! Fit once on the balanced training matrix, then applied unchanged to both
//! partitions. Standard deviation is the population form (ddof = 0).

use crate::error::{PrepError, Result};
use crate::utils::{DataLoader, DataSaver};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Behaviour for a feature whose training standard deviation is zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroVariancePolicy {
    /// Emit 0.0 for every value of the feature
    #[default]
    Zero,
    /// Fail with [`PrepError::DegenerateFeature`]
    Fail,
}

/// Fitted parameters for one feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Mean
    pub center: f64,
    /// Population standard deviation
    pub scale: f64,
}

/// Standard scaler over a named feature matrix
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    features: Vec<String>,
    params: Vec<ScalerParams>,
    #[serde(skip)]
    zero_variance: ZeroVariancePolicy,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zero_variance(mut self, policy: ZeroVariancePolicy) -> Self {
        self.zero_variance = policy;
        self
    }

    /// Learn per-column mean and standard deviation
    pub fn fit(&mut self, features: &[String], x: &Array2<f64>) -> Result<&mut Self> {
        if features.len() != x.ncols() {
            return Err(PrepError::ShapeError {
                expected: format!("{} columns", features.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        if x.nrows() == 0 {
            return Err(PrepError::EmptyResult("no training rows to fit the scaler".to_string()));
        }

        let n = x.nrows() as f64;
        let mut params = Vec::with_capacity(x.ncols());
        for (name, column) in features.iter().zip(x.axis_iter(Axis(1))) {
            let mean = column.sum() / n;
            let first = column[0];
            let std = if column.iter().all(|v| *v == first) {
                0.0
            } else {
                (column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
            };

            if std == 0.0 {
                match self.zero_variance {
                    ZeroVariancePolicy::Fail => {
                        return Err(PrepError::DegenerateFeature(name.clone()))
                    }
                    ZeroVariancePolicy::Zero => {
                        warn!(feature = %name, "Zero standard deviation, scaled values set to 0");
                    }
                }
            }
            params.push(ScalerParams { center: mean, scale: std });
        }

        self.features = features.to_vec();
        self.params = params;
        self.is_fitted = true;
        Ok(self)
    }

    /// `(x - mean) / std` per column; zero-variance columns become 0.0
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }
        self.check_width(x)?;

        let mut out = x.to_owned();
        for (mut column, p) in out.axis_iter_mut(Axis(1)).zip(&self.params) {
            if p.scale == 0.0 {
                column.fill(0.0);
            } else {
                column.mapv_inplace(|v| (v - p.center) / p.scale);
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, features: &[String], x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(features, x)?;
        self.transform(x)
    }

    /// Undo [`transform`](Self::transform). Zero-variance columns come back
    /// as their training mean.
    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }
        self.check_width(x)?;

        let mut out = x.to_owned();
        for (mut column, p) in out.axis_iter_mut(Axis(1)).zip(&self.params) {
            column.mapv_inplace(|v| v * p.scale + p.center);
        }
        Ok(out)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }
        DataSaver::save_json(self, path)
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let scaler: Self = DataLoader::load_json(path)?;
        if scaler.features.len() != scaler.params.len() {
            return Err(PrepError::SerializationError(format!(
                "scaler has {} features but {} parameter sets",
                scaler.features.len(),
                scaler.params.len()
            )));
        }
        Ok(scaler)
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.params.len() {
            return Err(PrepError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
        let mut max = 0.0f64;
        ndarray::Zip::from(a).and(b).for_each(|x, y| max = max.max((x - y).abs()));
        max
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0], [5.0, 50.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&names(2), &x).unwrap();

        for column in scaled.axis_iter(Axis(1)) {
            let mean = column.sum() / 5.0;
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 5.0;
            assert!(mean.abs() < 1e-10);
            assert!((var - 1.0).abs() < 1e-10);
        }
        assert!((scaler.params()[0].scale - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_transform() {
        let x = array![[1.0, -3.0], [2.0, 0.5], [7.0, 9.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&names(2), &x).unwrap();
        let restored = scaler.inverse_transform(&scaled).unwrap();

        assert!(max_abs_diff(&x, &restored) < 1e-10);
    }

    #[test]
    fn test_params_come_from_training_rows_only() {
        let train = array![[0.0], [2.0], [4.0], [6.0]];
        let test = array![[100.0], [110.0]];

        let mut scaler = StandardScaler::new();
        scaler.fit(&names(1), &train).unwrap();
        let scaled_test = scaler.transform(&test).unwrap();

        let mut train_only = StandardScaler::new();
        train_only.fit(&names(1), &train).unwrap();
        assert_eq!(scaler.params(), train_only.params());

        let mut test_only = StandardScaler::new();
        test_only.fit(&names(1), &test).unwrap();
        assert_ne!(scaler.params(), test_only.params());

        let p = scaler.params()[0];
        assert!((scaled_test[[0, 0]] - (100.0 - p.center) / p.scale).abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_policies() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];

        let mut zero = StandardScaler::new();
        let scaled = zero.fit_transform(&names(2), &x).unwrap();
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));
        assert!(scaled.iter().all(|v| v.is_finite()));

        let mut fail = StandardScaler::new().with_zero_variance(ZeroVariancePolicy::Fail);
        match fail.fit(&names(2), &x) {
            Err(PrepError::DegenerateFeature(name)) => assert_eq!(name, "f1"),
            other => panic!("expected degenerate feature, got {:?}", other),
        }
    }

    #[test]
    fn test_transform_width_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&names(2), &array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(PrepError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");

        let mut scaler = StandardScaler::new();
        scaler.fit(&names(2), &array![[1.0, 2.0], [3.0, 8.0]]).unwrap();
        scaler.save_json(&path).unwrap();

        let loaded = StandardScaler::load_json(&path).unwrap();
        assert_eq!(loaded.features(), scaler.features());
        assert_eq!(loaded.params(), scaler.params());
        assert!(loaded.is_fitted());
    }

    #[test]
    fn test_json_roundtrip_is_exact_across_fits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");

        for seed in 0..200u64 {
            let x = Array2::from_shape_fn((7, 3), |(i, j)| {
                let step = (seed * 31 + i as u64 * 17 + j as u64 * 7) % 101;
                step as f64 * 1.37 + (seed as f64) / 3.0 + 0.1 * j as f64
            });
            let mut scaler = StandardScaler::new();
            scaler.fit(&names(3), &x).unwrap();
            scaler.save_json(&path).unwrap();

            let loaded = StandardScaler::load_json(&path).unwrap();
            for (a, b) in loaded.params().iter().zip(scaler.params()) {
                assert_eq!(a.center.to_bits(), b.center.to_bits(), "fit {}", seed);
                assert_eq!(a.scale.to_bits(), b.scale.to_bits(), "fit {}", seed);
            }
            assert_eq!(loaded.transform(&x).unwrap(), scaler.transform(&x).unwrap());
        }
    }
}
