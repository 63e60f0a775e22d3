//! Error types for dmkit

use thiserror::Error;

/// Main error type for dmkit
#[derive(Error, Debug)]
pub enum DmError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DmError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        DmError::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for dmkit operations
pub type Result<T> = std::result::Result<T, DmError>;
