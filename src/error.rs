//! Crate-wide error type.
//!
//! Every fallible operation returns `PrepError`. The binary maps each variant
//! to a process exit code via [`PrepError::exit_code`]:
//!
//! - `2`: bad configuration or input (usage-level problems)
//! - `3`: the data source could not be loaded
//! - `4`: a numerical invariant did not hold

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrepError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to load data from '{source_id}': {cause}")]
    DataSource { source_id: String, cause: String },

    #[error("I/O error on '{path}': {cause}")]
    Io { path: String, cause: String },

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch in {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },
}

impl PrepError {
    pub fn data_source(source_id: impl Into<String>, cause: impl ToString) -> Self {
        Self::DataSource {
            source_id: source_id.into(),
            cause: cause.to_string(),
        }
    }

    pub fn io(path: impl Into<String>, cause: impl ToString) -> Self {
        Self::Io {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    pub fn dimension(what: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            what: what.into(),
            expected,
            found,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            PrepError::Configuration(_)
            | PrepError::Io { .. }
            | PrepError::InvalidInput(_)
            | PrepError::DimensionMismatch { .. } => 2,
            PrepError::DataSource { .. } => 3,
            PrepError::Numerical(_) => 4,
        }
    }
}
