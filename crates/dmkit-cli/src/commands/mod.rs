//! CLI command modules

pub mod config;
pub mod policy;
pub mod structure;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Machine-readable summary printed with `--json`
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub command: &'static str,
    pub timestamp: DateTime<Utc>,
    pub elapsed_secs: f64,
    #[serde(flatten)]
    pub details: serde_json::Value,
}

impl RunSummary {
    pub fn new(command: &'static str, elapsed_secs: f64, details: serde_json::Value) -> Self {
        Self {
            command,
            timestamp: Utc::now(),
            elapsed_secs,
            details,
        }
    }

    pub fn print(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}
