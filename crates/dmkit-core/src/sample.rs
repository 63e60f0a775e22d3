//! Logged MDP transitions `(s, a, r, sp)`

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::csv::CsvDocument;
use crate::error::{DmError, Result};

/// A single observed transition with 1-based state and action ids
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionSample {
    pub state: usize,
    pub action: usize,
    pub reward: f64,
    pub next_state: usize,
}

impl TransitionSample {
    /// Create a new sample
    pub fn new(state: usize, action: usize, reward: f64, next_state: usize) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
        }
    }
}

/// Parse samples from CSV text with columns `s`, `a`, `r`, `sp`
pub fn parse_samples(input: &str) -> Result<Vec<TransitionSample>> {
    let doc = CsvDocument::parse(input)?;
    let s = doc.column_index("s")?;
    let a = doc.column_index("a")?;
    let r = doc.column_index("r")?;
    let sp = doc.column_index("sp")?;

    doc.records
        .iter()
        .map(|record| {
            let sample = TransitionSample::new(
                record.parse(s)?,
                record.parse(a)?,
                record.parse(r)?,
                record.parse(sp)?,
            );
            if sample.state == 0 || sample.action == 0 || sample.next_state == 0 {
                return Err(DmError::parse(record.line, "state and action ids are 1-based"));
            }
            Ok(sample)
        })
        .collect()
}

/// Load samples from a CSV file
pub fn load_samples(path: impl AsRef<Path>) -> Result<Vec<TransitionSample>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let samples = parse_samples(&contents)?;
    debug!("Loaded {} transition samples from {:?}", samples.len(), path);
    Ok(samples)
}
