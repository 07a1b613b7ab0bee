//! Merge rules: defaults, override order, conflict handling.

use crate::config::GenerationTuning;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let tuning = GenerationTuning::default();
    Config::builder()
        .set_default("generation.contact_page_size", tuning.contact_page_size as u64)?
        .set_default(
            "generation.generation_concurrency",
            tuning.generation_concurrency as u64,
        )?
        .set_default(
            "generation.max_concurrent_writes",
            tuning.max_concurrent_writes as u64,
        )?
        .set_default(
            "generation.insert_flush_threshold",
            tuning.insert_flush_threshold as u64,
        )?
        .set_default(
            "generation.delete_flush_threshold",
            tuning.delete_flush_threshold as u64,
        )?
        .set_default("generation.bulk_page_size", tuning.bulk_page_size as u64)?
        .set_default("generation.bulk_concurrency", tuning.bulk_concurrency as u64)?
        .set_default("logging.level", "info")
}
