//! Label encoding
//!
//! Distinct label strings are sorted lexicographically and assigned dense
//! codes `0..K`. The sorted sequence is the [`ClassDictionary`], persisted
//! as a JSON array (index = code).

use crate::error::{PrepError, Result};
use crate::table::ColumnValues;
use crate::utils::{DataLoader, DataSaver};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Code to class-name bijection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassDictionary {
    names: Vec<String>,
}

impl ClassDictionary {
    /// Build from names already sorted and unique
    pub fn from_names(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(PrepError::EmptyResult("class dictionary has no entries".to_string()));
        }
        if names.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PrepError::ValidationError(
                "class names must be unique and sorted".to_string(),
            ));
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn encode(&self, label: &str) -> Option<i64> {
        self.names
            .binary_search_by(|n| n.as_str().cmp(label))
            .ok()
            .map(|i| i as i64)
    }

    pub fn decode(&self, code: i64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    /// Name for logs and reports, falling back to the code itself
    pub fn display_name(&self, code: i64) -> String {
        self.decode(code)
            .map(str::to_string)
            .unwrap_or_else(|| format!("class {}", code))
    }

    /// `(code, name)` pairs in code order
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.names.iter().enumerate().map(|(i, n)| (i as i64, n.as_str()))
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        DataSaver::save_json(self, path)
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let names: Vec<String> = DataLoader::load_json(path)?;
        Self::from_names(names)
    }
}

/// Label encoder
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    dictionary: Option<ClassDictionary>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the dictionary from a label column
    pub fn fit(&mut self, labels: &ColumnValues) -> Result<&mut Self> {
        let distinct: BTreeSet<&str> = match labels {
            ColumnValues::Text(values) => values.iter().flatten().map(String::as_str).collect(),
            ColumnValues::Numeric(_) => {
                return Err(PrepError::DataError("label column must be text".to_string()))
            }
        };
        if distinct.is_empty() {
            return Err(PrepError::EmptyResult("no labels to encode".to_string()));
        }

        let names = distinct.into_iter().map(str::to_string).collect();
        self.dictionary = Some(ClassDictionary::from_names(names)?);
        Ok(self)
    }

    pub fn dictionary(&self) -> Result<&ClassDictionary> {
        self.dictionary.as_ref().ok_or(PrepError::ModelNotFitted)
    }

    pub fn into_dictionary(self) -> Result<ClassDictionary> {
        self.dictionary.ok_or(PrepError::ModelNotFitted)
    }

    /// Encode a label column, preserving row order
    pub fn transform(&self, labels: &ColumnValues) -> Result<Array1<i64>> {
        let dictionary = self.dictionary()?;
        let values = match labels {
            ColumnValues::Text(values) => values,
            ColumnValues::Numeric(_) => {
                return Err(PrepError::DataError("label column must be text".to_string()))
            }
        };

        values
            .iter()
            .enumerate()
            .map(|(row, label)| {
                let label = label.as_deref().ok_or_else(|| {
                    PrepError::DataError(format!("missing label at row {}", row))
                })?;
                dictionary.encode(label).ok_or_else(|| {
                    PrepError::ValidationError(format!("unknown label '{}' at row {}", label, row))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Array1::from)
    }

    pub fn fit_transform(&mut self, labels: &ColumnValues) -> Result<Array1<i64>> {
        self.fit(labels)?;
        self.transform(labels)
    }
}
