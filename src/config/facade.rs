//! Loader facade: one call that layers every configuration source.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::VisitplanConfig;
use config::{ConfigError, Environment, File};
use std::path::{Path, PathBuf};

/// Loads [`VisitplanConfig`] from defaults, files and the environment.
///
/// Later layers win: defaults, global file, workspace `config/config.toml`,
/// workspace `config/{VISITPLAN_ENV}.toml`, then `VISITPLAN__SECTION__KEY` variables.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(workspace_root: &Path) -> Result<VisitplanConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        builder
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Load a single file on top of the defaults, ignoring global and workspace files.
    pub fn load_from_file(path: &Path) -> Result<VisitplanConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    pub fn default() -> VisitplanConfig {
        VisitplanConfig::default()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("VISITPLAN")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
