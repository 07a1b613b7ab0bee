//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::bulk::BulkModifier;
use crate::cli::parse::{Commands, FilterArgs};
use crate::cli::presentation::{
    format_bulk_modify_result, format_follow_up_list, format_generate_result, format_import_result,
};
use crate::clock::{Clock, SystemClock};
use crate::config::VisitplanConfig;
use crate::error::{ApiError, InvalidField, StorageError};
use crate::generation::{FollowUpGenerator, GenerateRequest, GenerationDeps};
use crate::model::{
    parse_date, Dataset, FollowUpFilter, FollowUpPatch, FollowUpStatus, GenerationPeriod,
};
use crate::progress::{ProgressSink, TracingProgress};
use crate::store::SledStore;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;

/// Runtime context for CLI execution: validated config, the opened store and the async runtime.
pub struct RunContext {
    config: VisitplanConfig,
    store: Arc<SledStore>,
    clock: Arc<dyn Clock>,
    progress: Arc<dyn ProgressSink>,
    runtime: Runtime,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = VisitplanConfig::load_validated(&workspace_root, config_path.as_deref())?;
        let store_path = config.system.storage.resolve_store_path(&workspace_root);
        std::fs::create_dir_all(&store_path).map_err(StorageError::IoError)?;
        let store = SledStore::open(&store_path)?;
        info!(store_path = %store_path.display(), "Store opened");
        Self::from_parts(config, store, Arc::new(SystemClock))
    }

    /// Context over an already opened store.
    pub fn from_parts(
        config: VisitplanConfig,
        store: SledStore,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ApiError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(StorageError::IoError)?;
        Ok(Self {
            config,
            store: Arc::new(store),
            clock,
            progress: Arc::new(TracingProgress),
            runtime,
        })
    }

    pub fn store(&self) -> &SledStore {
        &self.store
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let output = match command {
            Commands::Import { file } => {
                let raw = std::fs::read_to_string(file).map_err(StorageError::IoError)?;
                let dataset: Dataset = serde_json::from_str(&raw).map_err(StorageError::from)?;
                self.store.import(&dataset)?;
                format_import_result(&dataset, "text")?
            }
            Commands::Generate {
                outbreak,
                start_date,
                end_date,
                targeted,
                overwrite_existing,
                keep_team_assignment,
                contacts,
                format,
            } => {
                let request = GenerateRequest {
                    outbreak_id: outbreak.clone(),
                    start_date: start_date.clone(),
                    end_date: end_date.clone(),
                    targeted: *targeted,
                    overwrite_existing: *overwrite_existing,
                    keep_team_assignment: *keep_team_assignment,
                    contact_ids: non_empty(contacts),
                };
                let generator = FollowUpGenerator::new(
                    GenerationDeps::from_store(Arc::clone(&self.store), Arc::clone(&self.clock)),
                    self.config.generation.clone(),
                    Arc::clone(&self.progress),
                );
                let response = self
                    .runtime
                    .block_on(generator.generate_followups(&request))?;
                format_generate_result(&response, format)?
            }
            Commands::BulkModify {
                filter,
                set_status,
                set_team,
                clear_team,
                set_targeted,
                format,
            } => {
                let filter = build_filter(filter)?;
                let patch = FollowUpPatch {
                    status: set_status
                        .as_deref()
                        .map(|s| parse_status("set_status", s))
                        .transpose()?,
                    team_id: if *clear_team {
                        Some(None)
                    } else {
                        set_team.clone().map(Some)
                    },
                    targeted: *set_targeted,
                };
                let modifier = BulkModifier::new(
                    Arc::clone(&self.store) as Arc<dyn crate::store::FollowUpStore>,
                    Arc::clone(&self.clock),
                    self.config.generation.bulk_batch_config(),
                    Arc::clone(&self.progress),
                );
                let response = self
                    .runtime
                    .block_on(modifier.bulk_modify_follow_ups(&filter, &patch))?;
                format_bulk_modify_result(&response, format)?
            }
            Commands::List { filter, format } => {
                let filter = build_filter(filter)?;
                let follow_ups = self.store.list_follow_ups(&filter)?;
                format_follow_up_list(&follow_ups, format)?
            }
        };
        self.runtime.block_on(self.store.flush())?;
        Ok(output)
    }
}

fn non_empty(ids: &[String]) -> Option<Vec<String>> {
    if ids.is_empty() {
        None
    } else {
        Some(ids.to_vec())
    }
}

fn parse_status(field: &str, raw: &str) -> Result<FollowUpStatus, ApiError> {
    raw.parse()
        .map_err(|reason: String| ApiError::InvalidParameters(vec![InvalidField::new(field, reason)]))
}

/// Turn CLI filter flags into a store filter, reporting every bad flag at once.
fn build_filter(args: &FilterArgs) -> Result<FollowUpFilter, ApiError> {
    let mut invalid = Vec::new();
    let mut date_arg = |field: &str, raw: Option<&str>| match raw {
        Some(raw) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                invalid.push(InvalidField::new(field, format!("'{}' is not a valid date", raw)));
            }
            parsed
        }
        None => None,
    };
    let from = date_arg("from", args.from.as_deref());
    let to = date_arg("to", args.to.as_deref());

    let status = match args.status.as_deref().map(str::parse::<FollowUpStatus>) {
        Some(Ok(status)) => Some(status),
        Some(Err(reason)) => {
            invalid.push(InvalidField::new("status", reason));
            None
        }
        None => None,
    };
    if !invalid.is_empty() {
        return Err(ApiError::InvalidParameters(invalid));
    }

    let period = match (from, to) {
        (None, None) => None,
        (from, to) => Some(GenerationPeriod::new(
            from.unwrap_or(NaiveDate::MIN),
            to.unwrap_or(NaiveDate::MAX),
        )),
    };
    Ok(FollowUpFilter {
        outbreak_id: args.outbreak.clone(),
        contact_ids: non_empty(&args.contacts),
        period,
        team_id: args.team.clone(),
        status,
    })
}
