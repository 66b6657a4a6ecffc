//! Pipeline configuration
//!
//! Every constant of the cleaning and preparation runs (input files, manual
//! drop list, split fraction, seed, per-class sampling targets) lives here,
//! is serializable to TOML, and is validated before any stage runs.

use super::scaler::ZeroVariancePolicy;
use crate::error::{PrepError, Result};
use crate::synthetic::UnmappedClassPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Scaled training features
pub const TRAIN_FEATURES_FILE: &str = "X_train_scaled.csv";
/// Scaled test features
pub const TEST_FEATURES_FILE: &str = "X_test_scaled.csv";
/// Training labels
pub const TRAIN_LABELS_FILE: &str = "y_train.csv";
/// Test labels
pub const TEST_LABELS_FILE: &str = "y_test.csv";
/// Class dictionary (JSON array, index = code)
pub const CLASSES_FILE: &str = "classes.json";
/// Fitted scaler parameters
pub const SCALER_FILE: &str = "scaler.json";

/// How the ingestor treats files whose column sets differ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPolicy {
    /// Fail on any difference in column names
    #[default]
    Strict,
    /// Take the union of columns; absent cells become missing
    Union,
}

/// Target training count for one class code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTarget {
    pub code: i64,
    pub target: usize,
    /// Expected class name, checked against the class dictionary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ClassTarget {
    pub fn new(code: i64, target: usize) -> Self {
        Self {
            code,
            target,
            label: None,
        }
    }

    pub fn labelled(code: i64, target: usize, label: impl Into<String>) -> Self {
        Self {
            code,
            target,
            label: Some(label.into()),
        }
    }
}

/// Configuration of the cleaning run (ingest, sanitize, prune)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Directory holding the raw capture files
    pub data_dir: PathBuf,
    /// Raw capture file names, loaded in this order
    pub files: Vec<String>,
    /// Name of the class label column
    pub label_column: String,
    /// Columns always removed when present
    pub manual_drop: Vec<String>,
    /// Cross-file schema handling
    pub schema_policy: SchemaPolicy,
    /// Cleaned, unified artifact
    pub output: PathBuf,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            files: [
                "Friday-WorkingHours.pcap_REVI.csv",
                "Monday-WorkingHours.pcap_REVI.csv",
                "Thursday-WorkingHours.pcap_REVI.csv",
                "Tuesday-WorkingHours.pcap_REVI.csv",
                "Wednesday-WorkingHours.pcap_REVI.csv",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            label_column: "Label".to_string(),
            manual_drop: ["src_port", "dst_port", "protocol"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            schema_policy: SchemaPolicy::Strict,
            output: PathBuf::from("CICIDS.csv"),
        }
    }
}

impl CleaningConfig {
    /// Builder method to set the raw data directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Builder method to set the raw file names
    pub fn with_files<S: Into<String>>(mut self, files: impl IntoIterator<Item = S>) -> Self {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the schema policy
    pub fn with_schema_policy(mut self, policy: SchemaPolicy) -> Self {
        self.schema_policy = policy;
        self
    }

    /// Builder method to set the cleaned artifact path
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = path.into();
        self
    }

    /// Full paths of the raw inputs
    pub fn input_paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| self.data_dir.join(f)).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            return Err(PrepError::ConfigError(
                "cleaning.files must name at least one input".to_string(),
            ));
        }
        if self.label_column.trim().is_empty() {
            return Err(PrepError::ConfigError(
                "cleaning.label_column must not be empty".to_string(),
            ));
        }
        if self.manual_drop.iter().any(|c| c == &self.label_column) {
            return Err(PrepError::ConfigError(format!(
                "cleaning.manual_drop must not contain the label column '{}'",
                self.label_column
            )));
        }
        Ok(())
    }
}

/// Configuration of the preparation run (encode, split, balance, scale, persist)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreparationConfig {
    /// Cleaned artifact produced by the cleaning run
    pub input: PathBuf,
    /// Directory receiving the prepared artifacts
    pub output_dir: PathBuf,
    /// Name of the class label column
    pub label_column: String,
    /// Fraction of rows reserved for the test partition
    pub test_size: f64,
    /// Seed for the split and the synthesis
    pub random_state: u64,
    /// Same-class neighbors considered for each synthetic sample
    pub k_neighbors: usize,
    /// Handling of training classes with no sampling target
    pub unmapped_classes: UnmappedClassPolicy,
    /// Handling of zero standard deviation features in the scaler
    pub zero_variance: ZeroVariancePolicy,
    /// Target training count per class code
    pub sampling_strategy: Vec<ClassTarget>,
}

impl Default for PreparationConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("CICIDS.csv"),
            output_dir: PathBuf::from("."),
            label_column: "Label".to_string(),
            test_size: 0.3,
            random_state: 42,
            k_neighbors: 1,
            unmapped_classes: UnmappedClassPolicy::Reject,
            zero_variance: ZeroVariancePolicy::Zero,
            sampling_strategy: default_sampling_strategy(),
        }
    }
}

/// Targets for the fifteen CICIDS-2017 classes
fn default_sampling_strategy() -> Vec<ClassTarget> {
    vec![
        ClassTarget::labelled(0, 1_836_922, "BENIGN"),
        ClassTarget::labelled(1, 2_201, "Bot"),
        ClassTarget::labelled(2, 92_282, "DDoS"),
        ClassTarget::labelled(3, 9_027, "DoS GoldenEye"),
        ClassTarget::labelled(4, 156_340, "DoS Hulk"),
        ClassTarget::labelled(5, 6_008, "DoS Slowhttptest"),
        ClassTarget::labelled(6, 8_793, "DoS slowloris"),
        ClassTarget::labelled(7, 3_973, "FTP-Patator"),
        ClassTarget::labelled(8, 300, "Heartbleed"),
        ClassTarget::labelled(9, 300, "Infiltration"),
        ClassTarget::labelled(10, 159_421, "PortScan"),
        ClassTarget::labelled(11, 2_980, "SSH-Patator"),
        ClassTarget::labelled(12, 1_365, "Web Attack - Brute Force"),
        ClassTarget::labelled(13, 300, "Web Attack - Sql Injection"),
        ClassTarget::labelled(14, 679, "Web Attack - XSS"),
    ]
}

impl PreparationConfig {
    /// Builder method to set the cleaned input artifact
    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = path.into();
        self
    }

    /// Builder method to set the artifact directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Builder method to set the sampling targets
    pub fn with_sampling_strategy(mut self, targets: Vec<ClassTarget>) -> Self {
        self.sampling_strategy = targets;
        self
    }

    /// Builder method to set the neighbor count
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k;
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the test fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to set the unmapped class policy
    pub fn with_unmapped_classes(mut self, policy: UnmappedClassPolicy) -> Self {
        self.unmapped_classes = policy;
        self
    }

    /// Builder method to set the zero variance policy
    pub fn with_zero_variance(mut self, policy: ZeroVariancePolicy) -> Self {
        self.zero_variance = policy;
        self
    }

    /// Path of an artifact inside the output directory
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PrepError::InvalidParameter {
                name: "preparation.test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must lie strictly between 0 and 1".to_string(),
            });
        }
        if self.k_neighbors == 0 {
            return Err(PrepError::InvalidParameter {
                name: "preparation.k_neighbors".to_string(),
                value: "0".to_string(),
                reason: "at least one neighbor is required".to_string(),
            });
        }
        if self.label_column.trim().is_empty() {
            return Err(PrepError::ConfigError(
                "preparation.label_column must not be empty".to_string(),
            ));
        }

        let mut codes = HashSet::new();
        for entry in &self.sampling_strategy {
            if entry.code < 0 {
                return Err(PrepError::InvalidParameter {
                    name: "preparation.sampling_strategy.code".to_string(),
                    value: entry.code.to_string(),
                    reason: "class codes are non-negative".to_string(),
                });
            }
            if entry.target == 0 {
                return Err(PrepError::InvalidParameter {
                    name: format!("preparation.sampling_strategy[{}].target", entry.code),
                    value: "0".to_string(),
                    reason: "targets must be positive".to_string(),
                });
            }
            if !codes.insert(entry.code) {
                return Err(PrepError::ConfigError(format!(
                    "class code {} appears more than once in preparation.sampling_strategy",
                    entry.code
                )));
            }
        }
        Ok(())
    }
}

/// Configuration of the whole pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cleaning: CleaningConfig,
    pub preparation: PreparationConfig,
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.cleaning.validate()?;
        self.preparation.validate()
    }

    /// Load and validate a TOML configuration file
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PrepError::MissingInputFile(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as TOML
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| PrepError::SerializationError(e.to_string()))?;
        fs::write(path, toml_string)?;
        Ok(())
    }
}
