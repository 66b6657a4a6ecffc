//! Feature pruning
//!
//! Two passes over the predictor columns:
//! - automatic: numeric columns with zero variance are removed
//! - manual: a fixed list of identifier columns is removed when present
//!
//! The label column is held aside during the automatic pass and reattached
//! as the last column. Non-numeric predictors are not variance-tested and do
//! not survive reassembly.

use crate::error::{PrepError, Result};
use crate::table::{ColumnType, ColumnValues, Table, TableColumn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Pruning summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruneReport {
    /// Zero-variance columns, sorted lexicographically
    pub auto_removed: Vec<String>,
    /// Non-numeric predictor columns left out of the reassembled table
    pub non_numeric_removed: Vec<String>,
    /// Manually listed columns that were present, in list order
    pub manual_removed: Vec<String>,
    pub rows: usize,
    pub columns: usize,
}

/// Variance-threshold feature pruner
#[derive(Debug, Clone)]
pub struct FeaturePruner {
    label_column: String,
    manual_drop: Vec<String>,
}

impl FeaturePruner {
    pub fn new<S: Into<String>>(
        label_column: impl Into<String>,
        manual_drop: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            label_column: label_column.into(),
            manual_drop: manual_drop.into_iter().map(Into::into).collect(),
        }
    }

    /// Population variance of every numeric predictor column, in table order.
    /// A column whose minimum equals its maximum reports exactly zero.
    pub fn column_variances(&self, table: &Table) -> Vec<(String, f64)> {
        table
            .columns()
            .par_iter()
            .filter(|c| c.name() != self.label_column)
            .filter_map(|c| match c.values() {
                ColumnValues::Numeric(values) => Some((c.name().to_string(), variance(values))),
                ColumnValues::Text(_) => None,
            })
            .collect()
    }

    /// Sorted names of the zero-variance numeric predictor columns
    pub fn zero_variance_columns(&self, table: &Table) -> Vec<String> {
        let mut removed: Vec<String> = self
            .column_variances(table)
            .into_iter()
            .filter(|(_, var)| *var == 0.0)
            .map(|(name, _)| name)
            .collect();
        removed.sort();
        removed
    }

    /// Run both passes
    pub fn prune(&self, mut table: Table) -> Result<(Table, PruneReport)> {
        if table.height() == 0 {
            return Err(PrepError::EmptyResult("no rows to prune".to_string()));
        }

        let auto_removed = self.zero_variance_columns(&table);
        if auto_removed.is_empty() {
            info!("Automatic removal: no zero-variance columns found");
        } else {
            info!(count = auto_removed.len(), columns = ?auto_removed, "Automatic removal (zero variance)");
        }

        let label = table.take_column(&self.label_column);

        let mut kept: Vec<TableColumn> = Vec::with_capacity(table.width());
        let mut non_numeric_removed = Vec::new();
        for column in table.into_columns() {
            if column.column_type() == ColumnType::Text {
                non_numeric_removed.push(column.name().to_string());
            } else if auto_removed.binary_search_by(|n| n.as_str().cmp(column.name())).is_err() {
                kept.push(column);
            }
        }
        if !non_numeric_removed.is_empty() {
            info!(columns = ?non_numeric_removed, "Dropped non-numeric predictor columns");
        }

        let mut pruned = Table::new(kept)?;
        if let Some(label) = label {
            pruned.push_column(label)?;
        }

        let manual_removed = pruned.drop_columns(self.manual_drop.as_slice());
        if manual_removed.is_empty() {
            info!("Manual removal: none of the listed columns were found");
        } else {
            info!(count = manual_removed.len(), columns = ?manual_removed, "Manual removal");
        }

        let n_features = pruned
            .column_names()
            .iter()
            .filter(|n| **n != self.label_column)
            .count();
        if n_features == 0 {
            return Err(PrepError::EmptyResult(
                "no feature columns survived pruning".to_string(),
            ));
        }

        let report = PruneReport {
            auto_removed,
            non_numeric_removed,
            manual_removed,
            rows: pruned.height(),
            columns: pruned.width(),
        };
        Ok((pruned, report))
    }
}

fn variance(values: &[Option<f64>]) -> f64 {
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut sum, mut n) = (0.0, 0usize);
    for v in values.iter().flatten() {
        min = min.min(*v);
        max = max.max(*v);
        sum += v;
        n += 1;
    }
    if n == 0 || min == max {
        return 0.0;
    }

    let mean = sum / n as f64;
    values
        .iter()
        .flatten()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / n as f64
}
