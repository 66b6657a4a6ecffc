//! Row sanitation: infinite values become missing, rows with any missing
//! cell are removed. Columns are never dropped here.

use crate::error::{PrepError, Result};
use crate::table::{ColumnValues, Table};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Sanitation summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeReport {
    pub rows_before: usize,
    pub rows_after: usize,
    /// `rows_before - rows_after`
    pub rows_removed: usize,
    /// Cells rewritten from +/- infinity to missing
    pub infinite_cells: usize,
}

/// Row sanitizer
#[derive(Debug, Clone, Default)]
pub struct RowSanitizer;

impl RowSanitizer {
    pub fn new() -> Self {
        Self
    }

    /// Sanitize `table`. Fails with [`PrepError::EmptyResult`] when rows
    /// were present but none survive.
    pub fn sanitize(&self, mut table: Table) -> Result<(Table, SanitizeReport)> {
        let rows_before = table.height();

        let infinite_cells: usize = table
            .columns_mut()
            .par_iter_mut()
            .map(|column| match column.values_mut() {
                ColumnValues::Numeric(cells) => {
                    let mut replaced = 0;
                    for cell in cells.iter_mut() {
                        if matches!(cell, Some(v) if v.is_infinite()) {
                            *cell = None;
                            replaced += 1;
                        }
                    }
                    replaced
                }
                ColumnValues::Text(_) => 0,
            })
            .sum();

        let mut keep = vec![true; rows_before];
        for column in table.columns() {
            let values = column.values();
            for (row, k) in keep.iter_mut().enumerate() {
                if *k && values.is_missing(row) {
                    *k = false;
                }
            }
        }

        let table = table.filter_rows(&keep)?;
        let rows_after = table.height();

        let report = SanitizeReport {
            rows_before,
            rows_after,
            rows_removed: rows_before - rows_after,
            infinite_cells,
        };
        info!(
            rows_removed = report.rows_removed,
            infinite_cells = report.infinite_cells,
            "Removed rows with missing or infinite values"
        );

        if rows_before > 0 && rows_after == 0 {
            return Err(PrepError::EmptyResult(format!(
                "all {} rows contained missing or infinite values",
                rows_before
            )));
        }

        Ok((table, report))
    }
}
