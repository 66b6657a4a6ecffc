//! Multi-file ingestion
//!
//! Loads each raw capture file in order, skipping (and logging) files that
//! are absent or fail to parse, and concatenates the survivors into one
//! table. Column names are whitespace-trimmed on load. Cross-file schema
//! differences are handled according to [`SchemaPolicy`].

use super::config::SchemaPolicy;
use crate::error::{PrepError, Result};
use crate::table::{ColumnType, ColumnValues, Table, TableColumn};
use crate::utils::DataLoader;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome for one input file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLoad {
    pub path: PathBuf,
    /// Rows loaded, or `None` when the file was skipped
    pub rows: Option<usize>,
    /// Why the file was skipped
    pub error: Option<String>,
}

/// Ingestion summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub files: Vec<FileLoad>,
    pub rows: usize,
    pub columns: usize,
}

impl IngestReport {
    pub fn loaded_files(&self) -> usize {
        self.files.iter().filter(|f| f.rows.is_some()).count()
    }
}

/// Raw capture ingestor
#[derive(Debug, Clone)]
pub struct Ingestor {
    loader: DataLoader,
    schema_policy: SchemaPolicy,
}

impl Ingestor {
    pub fn new(label_column: &str, schema_policy: SchemaPolicy) -> Self {
        Self {
            loader: DataLoader::new().with_text_column(label_column),
            schema_policy,
        }
    }

    /// Load and concatenate `paths`. Fails only when no file loaded, or when
    /// a loaded file's schema conflicts under [`SchemaPolicy::Strict`].
    pub fn ingest(&self, paths: &[PathBuf]) -> Result<(Table, IngestReport)> {
        let mut loaded: Vec<(PathBuf, Table)> = Vec::new();
        let mut files = Vec::with_capacity(paths.len());

        for path in paths {
            info!(file = %path.display(), "Loading");
            match self.loader.load_table(path) {
                Ok(table) => {
                    info!(file = %path.display(), rows = table.height(), columns = table.width(), "Loaded");
                    files.push(FileLoad {
                        path: path.clone(),
                        rows: Some(table.height()),
                        error: None,
                    });
                    loaded.push((path.clone(), table));
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping input file");
                    files.push(FileLoad {
                        path: path.clone(),
                        rows: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if loaded.is_empty() {
            return Err(PrepError::NoInputsLoaded {
                attempted: paths.len(),
            });
        }

        let table = self.concat(loaded)?;
        info!(rows = table.height(), columns = table.width(), "Unified table");

        let report = IngestReport {
            files,
            rows: table.height(),
            columns: table.width(),
        };
        Ok((table, report))
    }

    /// Concatenate loaded tables in order, reconciling their schemas
    pub fn concat(&self, tables: Vec<(PathBuf, Table)>) -> Result<Table> {
        let schema = self.reconcile_schema(&tables)?;

        let mut unified = Table::default();
        for (path, table) in tables {
            let aligned = align(table, &schema, &path)?;
            unified.vstack(aligned)?;
        }
        Ok(unified)
    }

    /// Column names and types of the unified table
    fn reconcile_schema(&self, tables: &[(PathBuf, Table)]) -> Result<Vec<(String, ColumnType)>> {
        let (_, first) = &tables[0];
        let mut schema: Vec<(String, ColumnType)> = first
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.column_type()))
            .collect();

        for (path, table) in &tables[1..] {
            let expected: HashSet<&str> = schema.iter().map(|(n, _)| n.as_str()).collect();
            let found: HashSet<&str> = table.column_names().into_iter().collect();

            if expected != found {
                let mut missing: Vec<&str> = expected.difference(&found).copied().collect();
                let mut extra: Vec<&str> = found.difference(&expected).copied().collect();
                missing.sort_unstable();
                extra.sort_unstable();
                let detail = format!("missing columns {:?}, unexpected columns {:?}", missing, extra);

                match self.schema_policy {
                    SchemaPolicy::Strict => {
                        return Err(PrepError::SchemaMismatch {
                            file: path.display().to_string(),
                            detail,
                        })
                    }
                    SchemaPolicy::Union => {
                        warn!(file = %path.display(), %detail, "Reconciling schema by union");
                    }
                }
            }

            for column in table.columns() {
                match schema.iter_mut().find(|(n, _)| n == column.name()) {
                    Some((name, ty)) => {
                        if *ty != column.column_type() {
                            warn!(
                                file = %path.display(),
                                column = %name,
                                "Column type differs across files, keeping it as text"
                            );
                            *ty = ColumnType::Text;
                        }
                    }
                    None => schema.push((column.name().to_string(), column.column_type())),
                }
            }
        }

        Ok(schema)
    }
}

/// Reorder `table` to `schema`, filling absent columns with missing cells and
/// widening numeric columns to text where the schema says text
fn align(mut table: Table, schema: &[(String, ColumnType)], path: &Path) -> Result<Table> {
    let n_rows = table.height();
    let mut columns = Vec::with_capacity(schema.len());

    for (name, ty) in schema {
        let values = match table.take_column(name) {
            Some(column) => {
                let values = column.into_values();
                match (ty, values.column_type()) {
                    (ColumnType::Text, ColumnType::Numeric) => values.into_text(),
                    _ => values,
                }
            }
            None => ColumnValues::missing(*ty, n_rows),
        };
        columns.push(TableColumn::new(name.clone(), values));
    }

    if table.width() > 0 {
        return Err(PrepError::SchemaMismatch {
            file: path.display().to_string(),
            detail: format!("columns {:?} were not reconciled", table.column_names()),
        });
    }

    Table::new(columns)
}
