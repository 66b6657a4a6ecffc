//! Flow data conditioning
//!
//! One module per stage:
//! - ingestion and schema reconciliation
//! - row sanitation (infinite and missing values)
//! - zero-variance and manual feature pruning
//! - label encoding with a persisted class dictionary
//! - stratified train/test splitting
//! - z-score scaling fit on the training partition

pub mod config;
mod encoder;
pub mod feature_selection;
mod ingest;
mod sanitize;
mod scaler;
mod split;

pub use config::{
    ClassTarget, CleaningConfig, PipelineConfig, PreparationConfig, SchemaPolicy, CLASSES_FILE,
    SCALER_FILE, TEST_FEATURES_FILE, TEST_LABELS_FILE, TRAIN_FEATURES_FILE, TRAIN_LABELS_FILE,
};
pub use encoder::{ClassDictionary, LabelEncoder};
pub use feature_selection::{FeaturePruner, PruneReport};
pub use ingest::{FileLoad, IngestReport, Ingestor};
pub use sanitize::{RowSanitizer, SanitizeReport};
pub use scaler::{ScalerParams, StandardScaler, ZeroVariancePolicy};
pub use split::{SplitIndices, SplitResult, StratifiedSplitter};
