use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the selection → chart pipeline.
///
/// `InvalidSelection` aborts a whole recomputation. The table errors are
/// scoped to the chart slots that depend on the affected table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    #[error("invalid selection: {parameter} = {value:?} ({reason})")]
    InvalidSelection {
        parameter: String,
        value: String,
        reason: String,
    },

    #[error("missing table: {}", path.display())]
    MissingTable { path: PathBuf },

    #[error("malformed table {}: {reason}", path.display())]
    MalformedTable { path: PathBuf, reason: String },

    #[error("io error reading {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl DashboardError {
    pub fn invalid(parameter: &str, value: &str, reason: &str) -> Self {
        Self::InvalidSelection {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedTable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind for logs and JSON payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSelection { .. } => "invalid_selection",
            Self::MissingTable { .. } => "missing_table",
            Self::MalformedTable { .. } => "malformed_table",
            Self::Io { .. } => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
