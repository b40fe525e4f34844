use thiserror::Error;

use crate::job::JobStatus;

/// Why analysis of an input could not be completed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File is not readable: {0}")]
    Unreadable(String),

    #[error("Probe failed: {0}")]
    Probe(String),
}

#[derive(Error, Debug)]
pub enum HenkanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Media tool error: {0}")]
    Media(String),

    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HenkanError>;

/// Coarse classification of a failed file, used by batch summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Analysis,
    Validation,
    Encoding,
    Cancelled,
    Other,
}

impl FailureReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Validation => "validation",
            Self::Encoding => "encoding",
            Self::Cancelled => "cancelled",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&HenkanError> for FailureReason {
    fn from(error: &HenkanError) -> Self {
        match error {
            HenkanError::Analysis(_) => Self::Analysis,
            HenkanError::Validation(_) => Self::Validation,
            HenkanError::Encoding(_) | HenkanError::Media(_) => Self::Encoding,
            HenkanError::Cancelled(_) => Self::Cancelled,
            _ => Self::Other,
        }
    }
}
