//! Configuration layering as seen by the CLI run context.

use std::sync::Mutex;
use tempfile::TempDir;
use visitplan::cli::RunContext;
use visitplan::config::{ConfigLoader, VisitplanConfig};
use visitplan::error::ApiError;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Points XDG_CONFIG_HOME at an empty directory for the duration of a test.
struct IsolatedConfigHome {
    _dir: TempDir,
    previous: Option<String>,
}

impl IsolatedConfigHome {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let previous = std::env::var("XDG_CONFIG_HOME").ok();
        std::env::set_var("XDG_CONFIG_HOME", dir.path());
        Self { _dir: dir, previous }
    }
}

impl Drop for IsolatedConfigHome {
    fn drop(&mut self) {
        match &self.previous {
            Some(v) => std::env::set_var("XDG_CONFIG_HOME", v),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }
}

#[test]
fn workspace_store_path_is_created_relative_to_workspace() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _home = IsolatedConfigHome::new();
    let workspace = TempDir::new().unwrap();
    std::fs::create_dir_all(workspace.path().join("config")).unwrap();
    std::fs::write(
        workspace.path().join("config").join("config.toml"),
        "[system.storage]\nstore_path = \"data/visits\"\n\n[generation]\ncontact_page_size = 25\n",
    )
    .unwrap();

    let config = ConfigLoader::load(workspace.path()).unwrap();
    assert_eq!(config.generation.contact_page_size, 25);

    let ctx = RunContext::new(workspace.path().to_path_buf(), None).unwrap();
    drop(ctx);
    assert!(workspace.path().join("data").join("visits").is_dir());
}

#[test]
fn invalid_tuning_stops_context_creation() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _home = IsolatedConfigHome::new();
    let workspace = TempDir::new().unwrap();
    let file = workspace.path().join("custom.toml");
    std::fs::write(
        &file,
        "[system.storage]\nstore_path = \"store\"\n\n[generation]\nmax_concurrent_writes = 0\n",
    )
    .unwrap();

    let err = RunContext::new(workspace.path().to_path_buf(), Some(file)).err().unwrap();
    assert!(matches!(err, ApiError::ConfigError(msg) if msg.contains("max_concurrent_writes")));
}

#[test]
fn missing_explicit_file_is_a_config_error() {
    let workspace = TempDir::new().unwrap();
    let err = VisitplanConfig::load_validated(
        workspace.path(),
        Some(&workspace.path().join("absent.toml")),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::ConfigError(_)));
}
