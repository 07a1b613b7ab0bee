//! Configuration System
//!
//! Layered configuration for storage location, generation tuning knobs and logging. Sources are
//! merged by [`ConfigLoader`]; the result is checked with [`VisitplanConfig::validate`] before a
//! run starts.

use crate::batch::BatchConfig;
use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::queue::QueueConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitplanConfig {
    /// System-wide settings
    #[serde(default)]
    pub system: SystemConfig,

    /// Throughput knobs for generation and bulk modification
    #[serde(default)]
    pub generation: GenerationTuning,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled database directory; relative paths resolve against the workspace root
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the store directory. Without a configured path the platform data directory is
    /// used, falling back to `.visitplan/store` inside the workspace.
    pub fn resolve_store_path(&self, workspace_root: &Path) -> PathBuf {
        match &self.store_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => workspace_root.join(path),
            None => ProjectDirs::from("org", "visitplan", "visitplan")
                .map(|dirs| dirs.data_dir().join("store"))
                .unwrap_or_else(|| workspace_root.join(".visitplan").join("store")),
        }
    }
}

/// Page sizes, concurrency caps and flush thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationTuning {
    #[serde(default = "default_contact_page_size")]
    pub contact_page_size: usize,

    /// Contacts planned concurrently within one page
    #[serde(default = "default_generation_concurrency")]
    pub generation_concurrency: usize,

    /// Bulk writes in flight at once
    #[serde(default = "default_max_concurrent_writes")]
    pub max_concurrent_writes: usize,

    #[serde(default = "default_insert_flush_threshold")]
    pub insert_flush_threshold: usize,

    /// Bounded by the store's id-set clause limit
    #[serde(default = "default_delete_flush_threshold")]
    pub delete_flush_threshold: usize,

    #[serde(default = "default_bulk_page_size")]
    pub bulk_page_size: usize,

    /// Records patched concurrently within one bulk page
    #[serde(default = "default_bulk_concurrency")]
    pub bulk_concurrency: usize,
}

fn default_contact_page_size() -> usize {
    1000
}

fn default_generation_concurrency() -> usize {
    100
}

fn default_max_concurrent_writes() -> usize {
    10
}

fn default_insert_flush_threshold() -> usize {
    100_000
}

fn default_delete_flush_threshold() -> usize {
    900
}

fn default_bulk_page_size() -> usize {
    1000
}

fn default_bulk_concurrency() -> usize {
    10
}

impl Default for GenerationTuning {
    fn default() -> Self {
        Self {
            contact_page_size: default_contact_page_size(),
            generation_concurrency: default_generation_concurrency(),
            max_concurrent_writes: default_max_concurrent_writes(),
            insert_flush_threshold: default_insert_flush_threshold(),
            delete_flush_threshold: default_delete_flush_threshold(),
            bulk_page_size: default_bulk_page_size(),
            bulk_concurrency: default_bulk_concurrency(),
        }
    }
}

impl GenerationTuning {
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            insert_flush_threshold: self.insert_flush_threshold,
            delete_flush_threshold: self.delete_flush_threshold,
            max_concurrent_writes: self.max_concurrent_writes,
        }
    }

    /// Contact pages are handled by one whole-page action, so per-item concurrency is unused.
    pub fn contact_batch_config(&self) -> BatchConfig {
        BatchConfig {
            page_size: self.contact_page_size,
            per_item_concurrency: self.generation_concurrency,
            start_page: 0,
        }
    }

    pub fn bulk_batch_config(&self) -> BatchConfig {
        BatchConfig {
            page_size: self.bulk_page_size,
            per_item_concurrency: self.bulk_concurrency,
            start_page: 0,
        }
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let knobs = [
            ("contact_page_size", self.contact_page_size),
            ("generation_concurrency", self.generation_concurrency),
            ("max_concurrent_writes", self.max_concurrent_writes),
            ("insert_flush_threshold", self.insert_flush_threshold),
            ("delete_flush_threshold", self.delete_flush_threshold),
            ("bulk_page_size", self.bulk_page_size),
            ("bulk_concurrency", self.bulk_concurrency),
        ];
        let errors: Vec<_> = knobs
            .iter()
            .filter(|(_, value)| *value == 0)
            .map(|(name, _)| ValidationError::Generation(name.to_string(), "must be positive".into()))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Generation(String, String),
    Logging(String),
    System(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Generation(knob, msg) => write!(f, "Generation '{}': {}", knob, msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
            ValidationError::System(msg) => write!(f, "System: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl SystemConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.storage.store_path {
            if path.as_os_str().is_empty() {
                return Err("Store path cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl VisitplanConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.system.validate() {
            errors.push(ValidationError::System(e));
        }
        if let Err(mut tuning) = self.generation.validate() {
            errors.append(&mut tuning);
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Load and validate in one step, folding every failure into [`ApiError::ConfigError`].
    pub fn load_validated(
        workspace_root: &Path,
        explicit_file: Option<&Path>,
    ) -> Result<Self, ApiError> {
        let config = match explicit_file {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(workspace_root)?,
        };
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(config)
    }
}
