//! Error types for follow-up generation and storage.

use crate::types::{FollowUpId, OutbreakId};
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Follow-up not found: {0}")]
    FollowUpNotFound(FollowUpId),

    #[error("Storage backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] bincode::Error),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(#[from] serde_json::Error),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// One offending request or configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidField {
    pub field: String,
    pub reason: String,
}

impl InvalidField {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for InvalidField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

fn join_fields(fields: &[InvalidField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid parameters: {}", join_fields(.0))]
    InvalidParameters(Vec<InvalidField>),

    #[error("Outbreak not found: {0}")]
    OutbreakNotFound(OutbreakId),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Location resolution failed: {0}")]
    LocationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// A generation run stopped part way; the counts are rows already committed.
    #[error("Follow-up generation aborted after inserting {inserted} and deleting {deleted}: {source}")]
    RunAborted {
        inserted: usize,
        deleted: usize,
        #[source]
        source: Box<ApiError>,
    },

    #[error("Bulk modification aborted after updating {updated}: {source}")]
    BulkModifyAborted {
        updated: usize,
        #[source]
        source: Box<ApiError>,
    },
}

impl ApiError {
    /// Rows inserted before the failure, when the error came from a generation run.
    pub fn committed_inserts(&self) -> Option<usize> {
        match self {
            ApiError::RunAborted { inserted, .. } => Some(*inserted),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
