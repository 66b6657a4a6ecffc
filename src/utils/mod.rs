//! Utility functions and types

pub mod data_loader;

pub use data_loader::{table_from_dataframe, table_to_dataframe, DataLoader, DataSaver, MISSING_TOKENS};
