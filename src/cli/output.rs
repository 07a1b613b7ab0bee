//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::InvalidParameters(fields) => {
            let mut lines = vec!["Invalid parameters:".to_string()];
            lines.extend(fields.iter().map(|f| format!("  - {}", f)));
            lines.join("\n")
        }
        ApiError::RunAborted {
            inserted,
            deleted,
            source,
        } => format!(
            "Generation aborted: {}\n  Already committed: {} inserted, {} deleted",
            source, inserted, deleted
        ),
        ApiError::BulkModifyAborted { updated, source } => format!(
            "Bulk modification aborted: {}\n  Already updated: {}",
            source, updated
        ),
        other => other.to_string(),
    }
}
