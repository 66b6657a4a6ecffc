//! Typed in-memory table passed between the cleaning stages
//!
//! A [`Table`] is an ordered set of named columns of equal length. Every
//! column is either numeric or text, and every cell is an `Option`: `None`
//! is the missing-value marker, which is distinct from a column having been
//! removed from the schema.

use crate::error::{PrepError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Text,
}

/// Cells of a single column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnValues {
    /// Column of `len` missing cells
    pub fn missing(column_type: ColumnType, len: usize) -> Self {
        match column_type {
            ColumnType::Numeric => ColumnValues::Numeric(vec![None; len]),
            ColumnType::Text => ColumnValues::Text(vec![None; len]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnValues::Numeric(_) => ColumnType::Numeric,
            ColumnValues::Text(_) => ColumnType::Text,
        }
    }

    /// Whether the cell at `row` holds the missing marker
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnValues::Numeric(v) => v[row].is_none(),
            ColumnValues::Text(v) => v[row].is_none(),
        }
    }

    /// Render numeric cells as text; text columns pass through
    pub fn into_text(self) -> Self {
        match self {
            ColumnValues::Numeric(v) => ColumnValues::Text(
                v.into_iter().map(|c| c.map(|x| x.to_string())).collect(),
            ),
            text => text,
        }
    }

    fn filter(&self, mask: &[bool]) -> Self {
        fn keep<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(mask)
                .filter(|(_, &m)| m)
                .map(|(v, _)| v.clone())
                .collect()
        }

        match self {
            ColumnValues::Numeric(v) => ColumnValues::Numeric(keep(v, mask)),
            ColumnValues::Text(v) => ColumnValues::Text(keep(v, mask)),
        }
    }

    /// Append the cells of `other`, which must have the same type
    pub fn append(&mut self, other: ColumnValues) -> Result<()> {
        match (self, other) {
            (ColumnValues::Numeric(a), ColumnValues::Numeric(b)) => a.extend(b),
            (ColumnValues::Text(a), ColumnValues::Text(b)) => a.extend(b),
            (a, b) => {
                return Err(PrepError::DataError(format!(
                    "cannot append {:?} cells to a {:?} column",
                    b.column_type(),
                    a.column_type()
                )))
            }
        }
        Ok(())
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    name: String,
    values: ColumnValues,
}

impl TableColumn {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Numeric column from fully present values
    pub fn numeric(name: impl Into<String>, values: &[f64]) -> Self {
        Self::new(
            name,
            ColumnValues::Numeric(values.iter().copied().map(Some).collect()),
        )
    }

    /// Text column from fully present values
    pub fn text<S: AsRef<str>>(name: impl Into<String>, values: &[S]) -> Self {
        Self::new(
            name,
            ColumnValues::Text(values.iter().map(|s| Some(s.as_ref().to_string())).collect()),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ColumnValues {
        &mut self.values
    }

    pub fn into_values(self) -> ColumnValues {
        self.values
    }

    pub fn column_type(&self) -> ColumnType {
        self.values.column_type()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered collection of equal-length, uniquely named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<TableColumn>,
    n_rows: usize,
}

impl Table {
    /// Build a table, checking column lengths and name uniqueness
    pub fn new(columns: Vec<TableColumn>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut seen = HashSet::with_capacity(columns.len());

        for column in &columns {
            if column.len() != n_rows {
                return Err(PrepError::ShapeError {
                    expected: format!("{} rows", n_rows),
                    actual: format!("{} rows in column '{}'", column.len(), column.name()),
                });
            }
            if !seen.insert(column.name().to_string()) {
                return Err(PrepError::DataError(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
        }

        Ok(Self { columns, n_rows })
    }

    pub fn height(&self) -> usize {
        self.n_rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [TableColumn] {
        &mut self.columns
    }

    pub fn into_columns(self) -> Vec<TableColumn> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Remove a column from the schema and hand it back
    pub fn take_column(&mut self, name: &str) -> Option<TableColumn> {
        let idx = self.position(name)?;
        let column = self.columns.remove(idx);
        if self.columns.is_empty() {
            self.n_rows = 0;
        }
        Some(column)
    }

    /// Append a column at the end of the schema
    pub fn push_column(&mut self, column: TableColumn) -> Result<()> {
        if self.contains(column.name()) {
            return Err(PrepError::DataError(format!(
                "duplicate column name '{}'",
                column.name()
            )));
        }
        if self.columns.is_empty() {
            self.n_rows = column.len();
        } else if column.len() != self.n_rows {
            return Err(PrepError::ShapeError {
                expected: format!("{} rows", self.n_rows),
                actual: format!("{} rows in column '{}'", column.len(), column.name()),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Drop the named columns that exist; returns the dropped names in the
    /// order they were requested
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let mut dropped = Vec::new();
        for name in names {
            if self.take_column(name.as_ref()).is_some() {
                dropped.push(name.as_ref().to_string());
            }
        }
        dropped
    }

    /// Keep the rows whose mask entry is `true`, preserving order
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Table> {
        if mask.len() != self.n_rows {
            return Err(PrepError::ShapeError {
                expected: format!("mask of {} entries", self.n_rows),
                actual: format!("{} entries", mask.len()),
            });
        }

        let n_rows = mask.iter().filter(|&&m| m).count();
        let columns = self
            .columns
            .iter()
            .map(|c| TableColumn::new(c.name.clone(), c.values.filter(mask)))
            .collect();

        Ok(Table { columns, n_rows })
    }

    /// Reorder the columns to `order`, which must name exactly this table's columns
    pub fn reorder<S: AsRef<str>>(&mut self, order: &[S]) -> Result<()> {
        if order.len() != self.columns.len() {
            return Err(PrepError::ShapeError {
                expected: format!("{} column names", self.columns.len()),
                actual: format!("{} names", order.len()),
            });
        }
        let mut reordered = Vec::with_capacity(order.len());
        for name in order {
            let column = self
                .take_column(name.as_ref())
                .ok_or_else(|| PrepError::FeatureNotFound(name.as_ref().to_string()))?;
            reordered.push(column);
        }
        self.columns = reordered;
        Ok(())
    }

    /// Append the rows of `other`, whose schema must carry the same column
    /// names (in any order) and types
    pub fn vstack(&mut self, other: Table) -> Result<()> {
        if self.columns.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.width() != self.width() {
            return Err(PrepError::ShapeError {
                expected: format!("{} columns", self.width()),
                actual: format!("{} columns", other.width()),
            });
        }

        let added = other.n_rows;
        let mut other = other;
        for column in &mut self.columns {
            let incoming = other
                .take_column(&column.name)
                .ok_or_else(|| PrepError::FeatureNotFound(column.name.clone()))?;
            column.values.append(incoming.into_values())?;
        }
        self.n_rows += added;
        Ok(())
    }

    /// Dense `f64` matrix of every column; all columns must be numeric and
    /// free of missing cells
    pub fn to_array2(&self) -> Result<Array2<f64>> {
        let n_cols = self.columns.len();
        let mut data = Vec::with_capacity(self.n_rows * n_cols);
        let mut cols = Vec::with_capacity(n_cols);

        for column in &self.columns {
            match column.values() {
                ColumnValues::Numeric(v) => cols.push(v),
                ColumnValues::Text(_) => {
                    return Err(PrepError::DataError(format!(
                        "feature column '{}' is not numeric",
                        column.name()
                    )))
                }
            }
        }

        for row in 0..self.n_rows {
            for (col_idx, values) in cols.iter().enumerate() {
                let value = values[row].ok_or_else(|| {
                    PrepError::DataError(format!(
                        "missing value in feature column '{}' at row {}",
                        self.columns[col_idx].name(),
                        row
                    ))
                })?;
                data.push(value);
            }
        }

        Ok(Array2::from_shape_vec((self.n_rows, n_cols), data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::new(vec![
            TableColumn::numeric("a", &[1.0, 2.0, 3.0]),
            TableColumn::numeric("b", &[4.0, 5.0, 6.0]),
            TableColumn::text("Label", &["x", "y", "x"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_ragged_columns() {
        let result = Table::new(vec![
            TableColumn::numeric("a", &[1.0, 2.0]),
            TableColumn::numeric("b", &[1.0]),
        ]);
        assert!(matches!(result, Err(PrepError::ShapeError { .. })));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let result = Table::new(vec![
            TableColumn::numeric("a", &[1.0]),
            TableColumn::numeric("a", &[2.0]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_take_and_push_column() {
        let mut table = sample_table();
        let label = table.take_column("Label").unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);

        table.push_column(label).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b", "Label"]);
        assert_eq!(table.height(), 3);
    }

    #[test]
    fn test_drop_columns_reports_existing_only() {
        let mut table = sample_table();
        let dropped = table.drop_columns(&["missing", "b"]);
        assert_eq!(dropped, vec!["b".to_string()]);
        assert_eq!(table.width(), 2);
    }

    #[test]
    fn test_filter_rows() {
        let table = sample_table();
        let filtered = table.filter_rows(&[true, false, true]).unwrap();
        assert_eq!(filtered.height(), 2);
        assert_eq!(
            filtered.column("a").unwrap().values(),
            &ColumnValues::Numeric(vec![Some(1.0), Some(3.0)])
        );
    }

    #[test]
    fn test_vstack_aligns_by_name() {
        let mut first = sample_table();
        let second = Table::new(vec![
            TableColumn::text("Label", &["z"]),
            TableColumn::numeric("b", &[9.0]),
            TableColumn::numeric("a", &[7.0]),
        ])
        .unwrap();

        first.vstack(second).unwrap();
        assert_eq!(first.height(), 4);
        assert_eq!(
            first.column("b").unwrap().values(),
            &ColumnValues::Numeric(vec![Some(4.0), Some(5.0), Some(6.0), Some(9.0)])
        );
    }

    #[test]
    fn test_to_array2_requires_numeric() {
        let table = sample_table();
        assert!(table.to_array2().is_err());

        let mut numeric = sample_table();
        numeric.take_column("Label");
        let x = numeric.to_array2().unwrap();
        assert_eq!(x.shape(), &[3, 2]);
        assert_eq!(x[[2, 1]], 6.0);
    }
}
