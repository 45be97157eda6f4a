use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Missing required column: {column}")]
    MissingRequiredColumn { column: String },

    #[error("Unparseable timestamp in retrieved_at: {value:?}")]
    UnparseableTimestamp { value: String },

    #[error("Failed to write output {}: {reason}", path.display())]
    OutputWriteFailure { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Short stable name of the error kind, used as a metric label
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InputNotFound { .. } => "input_not_found",
            PipelineError::MalformedRecord { .. } => "malformed_record",
            PipelineError::MissingRequiredColumn { .. } => "missing_required_column",
            PipelineError::UnparseableTimestamp { .. } => "unparseable_timestamp",
            PipelineError::OutputWriteFailure { .. } => "output_write_failure",
            PipelineError::Io(_) => "io",
            PipelineError::Config(_) => "config",
        }
    }

    pub(crate) fn missing_column(column: &str) -> Self {
        PipelineError::MissingRequiredColumn {
            column: column.to_string(),
        }
    }

    pub(crate) fn output(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::OutputWriteFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
