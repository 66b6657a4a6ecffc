//! Cleaning and preparation stages
//!
//! [`CleaningStage`] turns the raw capture files into one cleaned table and
//! writes it as the intermediate artifact. [`PreparationStage`] reads that
//! artifact back and produces the scaled, balanced train/test artifacts.
//! Both expose an in-memory entry point next to the file-based `run`.

use crate::error::{PrepError, Result};
use crate::preprocessing::{
    ClassDictionary, CleaningConfig, FeaturePruner, IngestReport, Ingestor, LabelEncoder,
    PreparationConfig, PruneReport, RowSanitizer, SanitizeReport, StandardScaler,
    StratifiedSplitter, CLASSES_FILE, SCALER_FILE, TEST_FEATURES_FILE, TEST_LABELS_FILE,
    TRAIN_FEATURES_FILE, TRAIN_LABELS_FILE,
};
use crate::synthetic::{class_counts, Sampler, SamplingStrategy, SMOTE};
use crate::table::Table;
use crate::utils::{DataLoader, DataSaver};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Header of the label artifacts
pub const LABEL_HEADER: &str = "Label";

/// Summary of a cleaning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    pub ingest: IngestReport,
    pub sanitize: SanitizeReport,
    pub prune: PruneReport,
    pub rows: usize,
    pub columns: usize,
    pub output: PathBuf,
    pub elapsed_secs: f64,
}

/// Ingest, sanitize, prune, write the cleaned artifact
#[derive(Debug, Clone)]
pub struct CleaningStage {
    config: CleaningConfig,
}

impl CleaningStage {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Sanitize and prune an already unified table
    pub fn clean_table(&self, table: Table) -> Result<(Table, SanitizeReport, PruneReport)> {
        if !table.contains(&self.config.label_column) {
            return Err(PrepError::FeatureNotFound(self.config.label_column.clone()));
        }

        let (table, sanitize) = RowSanitizer::new().sanitize(table)?;
        let pruner = FeaturePruner::new(
            self.config.label_column.as_str(),
            self.config.manual_drop.iter().map(String::as_str),
        );
        let (table, prune) = pruner.prune(table)?;
        info!(rows = table.height(), columns = table.width(), "Cleaned table");
        Ok((table, sanitize, prune))
    }

    pub fn run(&self) -> Result<CleaningReport> {
        let start = Instant::now();
        self.config.validate()?;

        let ingestor = Ingestor::new(&self.config.label_column, self.config.schema_policy);
        let (table, ingest) = ingestor.ingest(&self.config.input_paths())?;
        let (table, sanitize, prune) = self.clean_table(table)?;

        DataSaver::save_table(&table, &self.config.output)?;
        info!(file = %self.config.output.display(), "Saved cleaned data");

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(elapsed_secs, "Cleaning complete");

        Ok(CleaningReport {
            ingest,
            sanitize,
            prune,
            rows: table.height(),
            columns: table.width(),
            output: self.config.output.clone(),
            elapsed_secs,
        })
    }
}

/// Training rows of one class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCount {
    pub code: i64,
    pub label: String,
    pub count: usize,
}

/// Summary of a preparation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparationReport {
    pub classes: Vec<String>,
    pub features: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Training distribution after the split
    pub before_balancing: Vec<ClassCount>,
    /// Training distribution after synthesis
    pub after_balancing: Vec<ClassCount>,
    pub n_synthetic: BTreeMap<i64, usize>,
    pub artifacts: Vec<PathBuf>,
    pub elapsed_secs: f64,
}

/// Prepared partitions and the fitted state that produced them
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub dictionary: ClassDictionary,
    pub features: Vec<String>,
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
    pub scaler: StandardScaler,
}

/// Encode, split, balance, scale, persist
#[derive(Debug, Clone)]
pub struct PreparationStage {
    config: PreparationConfig,
}

impl PreparationStage {
    pub fn new(config: PreparationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreparationConfig {
        &self.config
    }

    /// Load the cleaned artifact
    pub fn load_cleaned(&self) -> Result<Table> {
        let table = DataLoader::new()
            .with_text_column(self.config.label_column.as_str())
            .load_table(&self.config.input)?;
        info!(
            file = %self.config.input.display(),
            rows = table.height(),
            columns = table.width(),
            "Loaded cleaned data"
        );
        Ok(table)
    }

    /// Class dictionary of the cleaned artifact
    pub fn list_classes(&self) -> Result<ClassDictionary> {
        let table = self.load_cleaned()?;
        let label = table
            .column(&self.config.label_column)
            .ok_or_else(|| PrepError::FeatureNotFound(self.config.label_column.clone()))?;

        let mut encoder = LabelEncoder::new();
        encoder.fit(label.values())?;
        encoder.into_dictionary()
    }

    /// Run encode, split, balance and scale on a cleaned table
    pub fn prepare_table(&self, mut table: Table) -> Result<(PreparedData, PreparationReport)> {
        let start = Instant::now();
        self.config.validate()?;

        let label = table
            .take_column(&self.config.label_column)
            .ok_or_else(|| PrepError::FeatureNotFound(self.config.label_column.clone()))?;
        if table.height() == 0 {
            return Err(PrepError::EmptyResult("cleaned table has no rows".to_string()));
        }
        if table.width() == 0 {
            return Err(PrepError::EmptyResult("cleaned table has no feature columns".to_string()));
        }

        let features: Vec<String> = table.column_names().iter().map(|s| s.to_string()).collect();
        let x = table.to_array2()?;

        let mut encoder = LabelEncoder::new();
        let y = encoder.fit_transform(label.values())?;
        let dictionary = encoder.into_dictionary()?;
        for (code, name) in dictionary.iter() {
            info!(code, class = name, "Class");
        }

        let split = StratifiedSplitter::new()
            .with_test_size(self.config.test_size)
            .with_random_state(self.config.random_state)
            .split(&x, &y)?;
        info!(
            train_rows = split.x_train.nrows(),
            test_rows = split.x_test.nrows(),
            "Split into train and test"
        );

        let before_balancing = distribution(&split.y_train, &dictionary);
        log_distribution("before balancing", &before_balancing);

        let strategy = SamplingStrategy::from_targets(&self.config.sampling_strategy, &dictionary)?
            .with_unmapped(self.config.unmapped_classes);
        let mut smote = SMOTE::new(strategy)
            .with_k_neighbors(self.config.k_neighbors)
            .with_seed(self.config.random_state);
        let balanced = smote.fit_resample(&split.x_train, &split.y_train)?;

        let after_balancing = distribution(&balanced.y, &dictionary);
        log_distribution("after balancing", &after_balancing);

        let mut scaler = StandardScaler::new().with_zero_variance(self.config.zero_variance);
        let x_train = scaler.fit_transform(&features, &balanced.x)?;
        let x_test = scaler.transform(&split.x_test)?;

        let report = PreparationReport {
            classes: dictionary.names().to_vec(),
            features: features.clone(),
            train_rows: x_train.nrows(),
            test_rows: x_test.nrows(),
            before_balancing,
            after_balancing,
            n_synthetic: balanced.n_synthetic,
            artifacts: Vec::new(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        let data = PreparedData {
            dictionary,
            features,
            x_train,
            x_test,
            y_train: balanced.y,
            y_test: split.y_test,
            scaler,
        };
        Ok((data, report))
    }

    /// Write every artifact into the output directory
    pub fn persist(&self, data: &PreparedData) -> Result<Vec<PathBuf>> {
        let train_x = self.config.artifact_path(TRAIN_FEATURES_FILE);
        let test_x = self.config.artifact_path(TEST_FEATURES_FILE);
        let train_y = self.config.artifact_path(TRAIN_LABELS_FILE);
        let test_y = self.config.artifact_path(TEST_LABELS_FILE);
        let classes = self.config.artifact_path(CLASSES_FILE);
        let scaler = self.config.artifact_path(SCALER_FILE);

        DataSaver::save_matrix(&data.features, &data.x_train, &train_x)?;
        DataSaver::save_matrix(&data.features, &data.x_test, &test_x)?;
        DataSaver::save_labels(&data.y_train, LABEL_HEADER, &train_y)?;
        DataSaver::save_labels(&data.y_test, LABEL_HEADER, &test_y)?;
        data.dictionary.save_json(&classes)?;
        data.scaler.save_json(&scaler)?;

        let artifacts = vec![train_x, test_x, train_y, test_y, classes, scaler];
        for path in &artifacts {
            info!(file = %path.display(), "Saved artifact");
        }
        Ok(artifacts)
    }

    pub fn run(&self) -> Result<PreparationReport> {
        let start = Instant::now();
        let table = self.load_cleaned()?;
        let (data, mut report) = self.prepare_table(table)?;
        report.artifacts = self.persist(&data)?;
        report.elapsed_secs = start.elapsed().as_secs_f64();
        info!(elapsed_secs = report.elapsed_secs, "Preparation complete");
        Ok(report)
    }
}

fn distribution(y: &Array1<i64>, dictionary: &ClassDictionary) -> Vec<ClassCount> {
    class_counts(y)
        .into_iter()
        .map(|(code, count)| ClassCount {
            code,
            label: dictionary.display_name(code),
            count,
        })
        .collect()
}

fn log_distribution(when: &str, counts: &[ClassCount]) {
    for c in counts {
        info!(class = %c.label, count = c.count, "Training distribution {}", when);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::ClassTarget;
    use crate::table::TableColumn;

    fn cleaned_table() -> Table {
        let mut a = Vec::new();
        let mut b = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            a.push(i as f64);
            b.push((i % 7) as f64 * 0.5);
            labels.push(if i < 20 { "BENIGN" } else if i < 26 { "DDoS" } else { "Bot" });
        }
        Table::new(vec![
            TableColumn::numeric("flow_duration", &a),
            TableColumn::numeric("fwd_packets", &b),
            TableColumn::text("Label", &labels),
        ])
        .unwrap()
    }

    fn stage() -> PreparationStage {
        PreparationStage::new(PreparationConfig::default().with_sampling_strategy(vec![
            ClassTarget::labelled(0, 14, "BENIGN"),
            ClassTarget::labelled(1, 10, "Bot"),
            ClassTarget::labelled(2, 10, "DDoS"),
        ]))
    }

    #[test]
    fn test_prepare_table_meets_targets() {
        let (data, report) = stage().prepare_table(cleaned_table()).unwrap();

        assert_eq!(data.dictionary.names(), &["BENIGN", "Bot", "DDoS"]);
        assert_eq!(class_counts(&data.y_train), BTreeMap::from([(0, 14), (1, 10), (2, 10)]));
        assert_eq!(report.test_rows, 9);
        assert_eq!(report.train_rows, 34);
        assert_eq!(report.before_balancing.iter().map(|c| c.count).sum::<usize>(), 21);
        assert_eq!(report.after_balancing[1].label, "Bot");
        assert_eq!(data.x_train.ncols(), 2);
    }

    #[test]
    fn test_unmapped_class_is_rejected() {
        let stage = PreparationStage::new(
            PreparationConfig::default()
                .with_sampling_strategy(vec![ClassTarget::new(0, 14), ClassTarget::new(2, 10)]),
        );
        assert!(matches!(
            stage.prepare_table(cleaned_table()),
            Err(PrepError::UnmappedClass { class: 1, .. })
        ));
    }

    #[test]
    fn test_clean_table_requires_label() {
        let stage = CleaningStage::new(CleaningConfig::default());
        let table = Table::new(vec![TableColumn::numeric("x", &[1.0, 2.0])]).unwrap();
        assert!(matches!(stage.clean_table(table), Err(PrepError::FeatureNotFound(_))));
    }
}
