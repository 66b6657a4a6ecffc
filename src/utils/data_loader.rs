//! Data loading and artifact persistence
//!
//! CSV parsing and writing go through polars; the result is converted to the
//! typed [`Table`] at the boundary so the pipeline stages never see a loosely
//! typed frame. Every artifact is written to a temporary file next to its
//! destination and renamed into place only after the write succeeded.

use crate::error::{PrepError, Result};
use crate::table::{ColumnValues, Table, TableColumn};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Text tokens treated as the missing-value marker
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

/// CSV loader producing typed tables
#[derive(Debug, Clone, Default)]
pub struct DataLoader {
    /// Columns that stay text even when every value parses as a number
    text_columns: Vec<String>,
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the given column as text
    pub fn with_text_column(mut self, name: impl Into<String>) -> Self {
        self.text_columns.push(name.into());
        self
    }

    /// Load a CSV file into a polars frame
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        if !path.is_file() {
            return Err(PrepError::MissingInputFile(path.to_path_buf()));
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        Ok(df)
    }

    /// Load a CSV file into a typed table with whitespace-trimmed column names
    pub fn load_table(&self, path: &Path) -> Result<Table> {
        let df = self.load_csv(path)?;
        table_from_dataframe(&df, &self.text_columns)
    }

    /// Load a numeric feature artifact: header names plus a dense matrix
    pub fn load_matrix(&self, path: &Path) -> Result<(Vec<String>, Array2<f64>)> {
        let table = self.load_table(path)?;
        let names = table.column_names().iter().map(|s| s.to_string()).collect();
        Ok((names, table.to_array2()?))
    }

    /// Load a single-column integer label artifact
    pub fn load_labels(&self, path: &Path, header: &str) -> Result<Array1<i64>> {
        let table = self.load_table(path)?;
        let column = table
            .column(header)
            .ok_or_else(|| PrepError::FeatureNotFound(header.to_string()))?;

        match column.values() {
            ColumnValues::Numeric(values) => values
                .iter()
                .enumerate()
                .map(|(row, v)| match v {
                    Some(x) if x.fract() == 0.0 => Ok(*x as i64),
                    _ => Err(PrepError::DataError(format!(
                        "label at row {} in {} is not an integer code",
                        row,
                        path.display()
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Array1::from_vec),
            ColumnValues::Text(_) => Err(PrepError::DataError(format!(
                "label column '{}' in {} is not numeric",
                header,
                path.display()
            ))),
        }
    }

    /// Read a JSON artifact
    pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
        if !path.is_file() {
            return Err(PrepError::MissingInputFile(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Convert a polars frame to a typed table.
///
/// Numeric dtypes become numeric columns. String columns become numeric when
/// every non-missing cell parses as a float (covers `Infinity` and `NaN`
/// spellings that defeat schema inference), unless listed in `text_columns`.
/// `NaN` is mapped to the missing marker.
pub fn table_from_dataframe(df: &DataFrame, text_columns: &[String]) -> Result<Table> {
    let mut columns = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let name = column.name().as_str().trim().to_string();
        let series = column.as_materialized_series();
        let keep_text = text_columns.iter().any(|t| t == &name);

        let values = match series.dtype() {
            DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::UInt64
            | DataType::UInt32
                if !keep_text =>
            {
                let cast = series.cast(&DataType::Float64)?;
                let ca = cast.f64()?;
                ColumnValues::Numeric(
                    ca.into_iter()
                        .map(|v| v.filter(|x| !x.is_nan()))
                        .collect(),
                )
            }
            _ => {
                let cast = series.cast(&DataType::String)?;
                let ca = cast.str()?;
                let cells: Vec<Option<&str>> = ca
                    .into_iter()
                    .map(|v| v.filter(|s| !MISSING_TOKENS.contains(&s.trim())))
                    .collect();
                if keep_text {
                    text_values(&cells)
                } else {
                    coerce_numeric(&cells).unwrap_or_else(|| text_values(&cells))
                }
            }
        };

        columns.push(TableColumn::new(name, values));
    }

    Table::new(columns)
}

fn text_values(cells: &[Option<&str>]) -> ColumnValues {
    ColumnValues::Text(cells.iter().map(|c| c.map(str::to_string)).collect())
}

fn coerce_numeric(cells: &[Option<&str>]) -> Option<ColumnValues> {
    let mut parsed = Vec::with_capacity(cells.len());
    for cell in cells {
        match cell {
            Some(s) => {
                let v: f64 = s.trim().parse().ok()?;
                parsed.push(if v.is_nan() { None } else { Some(v) });
            }
            None => parsed.push(None),
        }
    }
    Some(ColumnValues::Numeric(parsed))
}

/// Convert a typed table back to a polars frame
pub fn table_to_dataframe(table: &Table) -> Result<DataFrame> {
    let columns: Vec<Column> = table
        .columns()
        .iter()
        .map(|c| match c.values() {
            ColumnValues::Numeric(v) => Column::new(c.name().into(), v.as_slice()),
            ColumnValues::Text(v) => {
                let cells: Vec<Option<&str>> = v.iter().map(|s| s.as_deref()).collect();
                Column::new(c.name().into(), cells)
            }
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Atomic artifact writer
pub struct DataSaver;

impl DataSaver {
    /// Run `write` against a temporary file beside `path`, then rename it
    /// into place. Nothing is left at `path` if `write` fails.
    pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&mut File) -> Result<()>,
    {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        write(tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| PrepError::IoError(e.error))?;
        Ok(())
    }

    /// Save a polars frame as CSV with a header row
    pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
        Self::write_atomic(path, |file| {
            CsvWriter::new(file).include_header(true).finish(df)?;
            Ok(())
        })
    }

    /// Save a typed table as CSV
    pub fn save_table(table: &Table, path: &Path) -> Result<()> {
        let mut df = table_to_dataframe(table)?;
        Self::save_csv(&mut df, path)
    }

    /// Save a feature matrix with the given header names
    pub fn save_matrix(names: &[String], x: &Array2<f64>, path: &Path) -> Result<()> {
        if names.len() != x.ncols() {
            return Err(PrepError::ShapeError {
                expected: format!("{} columns", names.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let columns: Vec<Column> = names
            .iter()
            .zip(x.columns())
            .map(|(name, col)| Column::new(name.as_str().into(), col.to_vec()))
            .collect();
        let mut df = DataFrame::new(columns)?;
        Self::save_csv(&mut df, path)
    }

    /// Save integer labels as a single-column CSV
    pub fn save_labels(y: &Array1<i64>, header: &str, path: &Path) -> Result<()> {
        let mut df = DataFrame::new(vec![Column::new(header.into(), y.to_vec())])?;
        Self::save_csv(&mut df, path)
    }

    /// Save any serializable value as pretty-printed JSON
    pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
        Self::write_atomic(path, |file| {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_table_trims_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.csv", " a , b ,Label\n1,2,x\n3,4,y\n");

        let table = DataLoader::new().load_table(&path).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b", "Label"]);
        assert_eq!(table.height(), 2);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = DataLoader::new().load_table(&dir.path().join("nope.csv"));
        assert!(matches!(result, Err(PrepError::MissingInputFile(_))));
    }

    #[test]
    fn test_infinity_text_is_coerced_to_numeric() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "inf.csv",
            "rate,Label\nInfinity,x\n1.5,y\n-Infinity,x\n,y\n",
        );

        let table = DataLoader::new().load_table(&path).unwrap();
        let rate = table.column("rate").unwrap().values();
        assert_eq!(
            rate,
            &ColumnValues::Numeric(vec![
                Some(f64::INFINITY),
                Some(1.5),
                Some(f64::NEG_INFINITY),
                None
            ])
        );
    }

    #[test]
    fn test_text_column_stays_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "t.csv", "a,Label\n1,0\n2,1\n");

        let table = DataLoader::new()
            .with_text_column("Label")
            .load_table(&path)
            .unwrap();
        assert_eq!(
            table.column("Label").unwrap().values(),
            &ColumnValues::Text(vec![Some("0".to_string()), Some("1".to_string())])
        );
    }

    #[test]
    fn test_save_and_reload_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::new(vec![
            TableColumn::numeric("a", &[1.5, -2.0]),
            TableColumn::text("Label", &["BENIGN", "DDoS"]),
        ])
        .unwrap();

        let path = dir.path().join("out.csv");
        DataSaver::save_table(&table, &path).unwrap();

        let loaded = DataLoader::new()
            .with_text_column("Label")
            .load_table(&path)
            .unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_save_labels_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("y.csv");
        let y = Array1::from_vec(vec![0i64, 2, 1, 2]);

        DataSaver::save_labels(&y, "Label", &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("Label\n"));

        let loaded = DataLoader::new().load_labels(&path, "Label").unwrap();
        assert_eq!(loaded, y);
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.csv");

        let result = DataSaver::write_atomic(&path, |_| {
            Err(PrepError::DataError("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
