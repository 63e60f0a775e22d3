//! Observation table - immutable columnar dataset of categorical codes

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::csv::CsvDocument;
use crate::error::{DmError, Result};

/// Columnar table of positive integer category codes.
///
/// Each column is one variable. A variable's arity is the largest code
/// observed in its column; codes are expected to run from 1 to the arity,
/// gaps are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationTable {
    names: Vec<String>,
    columns: Vec<Vec<u32>>,
    arities: Vec<u32>,
    distinct: Vec<Vec<u32>>,
}

impl ObservationTable {
    /// Build a table from named columns
    pub fn from_columns(names: Vec<String>, columns: Vec<Vec<u32>>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(DmError::Data(format!(
                "{} names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        let rows = columns.first().map_or(0, Vec::len);
        if rows == 0 {
            return Err(DmError::Data("observation table has no rows".to_string()));
        }

        let mut seen = BTreeSet::new();
        for (name, column) in names.iter().zip(&columns) {
            if !seen.insert(name.as_str()) {
                return Err(DmError::Data(format!("duplicate variable '{name}'")));
            }
            if column.len() != rows {
                return Err(DmError::Data(format!(
                    "column '{name}' has {} rows, expected {rows}",
                    column.len()
                )));
            }
            if column.contains(&0) {
                return Err(DmError::Data(format!(
                    "column '{name}' contains a zero code; codes start at 1"
                )));
            }
        }

        let arities = columns
            .iter()
            .map(|c| c.iter().copied().max().unwrap_or(0))
            .collect();
        let distinct = columns
            .iter()
            .map(|c| c.iter().copied().collect::<BTreeSet<_>>().into_iter().collect())
            .collect();

        Ok(Self {
            names,
            columns,
            arities,
            distinct,
        })
    }

    /// Parse a CSV document with a header of variable names
    pub fn from_csv_str(input: &str) -> Result<Self> {
        let doc = CsvDocument::parse(input)?;
        let mut columns = vec![Vec::with_capacity(doc.records.len()); doc.header.len()];
        for record in &doc.records {
            for (idx, column) in columns.iter_mut().enumerate() {
                column.push(record.parse::<u32>(idx)?);
            }
        }
        Self::from_columns(doc.header, columns)
    }

    /// Load a table from a CSV file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let table = Self::from_csv_str(&contents)?;
        debug!(
            "Loaded {} variables x {} rows from {:?}",
            table.num_variables(),
            table.num_rows(),
            path
        );
        Ok(table)
    }

    pub fn num_variables(&self) -> usize {
        self.names.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns[0].len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, var: usize) -> &str {
        &self.names[var]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, var: usize) -> &[u32] {
        &self.columns[var]
    }

    /// Largest observed code of a variable
    pub fn arity(&self, var: usize) -> u32 {
        self.arities[var]
    }

    /// Distinct observed codes of a variable, ascending
    pub fn distinct_values(&self, var: usize) -> &[u32] {
        &self.distinct[var]
    }
}
