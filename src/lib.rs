//! cicflow-prep - CICIDS flow data conditioning
//!
//! Turns raw labelled network-flow captures into the artifacts a
//! multi-class intrusion classifier trains on: a cleaned unified table, then
//! scaled and class-balanced train/test partitions with a persisted class
//! dictionary.
//!
//! # Modules
//!
//! ## Data model
//! - [`table`] - Strongly typed columnar table with explicit missing cells
//! - [`utils`] - CSV and JSON loading, atomic artifact writes
//!
//! ## Stages
//! - [`preprocessing`] - Ingestion, sanitation, pruning, encoding, splitting, scaling
//! - [`synthetic`] - SMOTE oversampling to per-class targets
//! - [`pipeline`] - Cleaning and preparation stages
//!
//! ## Services
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data model
pub mod table;
pub mod utils;

// Stages
pub mod preprocessing;
pub mod synthetic;
pub mod pipeline;

// Services
pub mod cli;

pub use error::{PrepError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PrepError, Result};

    // Data model
    pub use crate::table::{ColumnType, ColumnValues, Table, TableColumn};
    pub use crate::utils::{DataLoader, DataSaver};

    // Preprocessing
    pub use crate::preprocessing::{
        ClassDictionary, ClassTarget, CleaningConfig, FeaturePruner, Ingestor, LabelEncoder,
        PipelineConfig, PreparationConfig, RowSanitizer, SchemaPolicy, StandardScaler,
        StratifiedSplitter, ZeroVariancePolicy,
    };

    // Synthetic data
    pub use crate::synthetic::{Sampler, SamplingStrategy, UnmappedClassPolicy, SMOTE};

    // Pipeline
    pub use crate::pipeline::{CleaningStage, PreparationStage};
}
