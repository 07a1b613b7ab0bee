//! Single generate entry point.
//!
//! Stages: validate request against outbreak settings, build the team/location index, page over
//! eligible contacts, plan each contact, stream the plans into the persistence queue, drain.

use crate::batch::{BatchActions, BatchOrchestrator, PageAction};
use crate::clock::Clock;
use crate::config::GenerationTuning;
use crate::eligibility::{EligibilityQuery, EligibleContacts};
use crate::error::{ApiError, InvalidField};
use crate::generation::plan::{plan_contact, ContactPlan, ContactPlanInput};
use crate::generation::request::{GenerateRequest, GenerateResponse, RunParameters};
use crate::model::{Contact, FollowUp};
use crate::progress::ProgressSink;
use crate::queue::PersistenceQueue;
use crate::store::{ContactStore, FollowUpStore, LocationService, OutbreakStore, TeamStore};
use crate::teams::TeamIndex;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Collaborators a generation run reads from and writes to.
#[derive(Clone)]
pub struct GenerationDeps {
    pub contacts: Arc<dyn ContactStore>,
    pub follow_ups: Arc<dyn FollowUpStore>,
    pub teams: Arc<dyn TeamStore>,
    pub locations: Arc<dyn LocationService>,
    pub outbreaks: Arc<dyn OutbreakStore>,
    pub clock: Arc<dyn Clock>,
}

impl GenerationDeps {
    /// All stores served by one backend.
    pub fn from_store<S>(store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: ContactStore + FollowUpStore + TeamStore + LocationService + OutbreakStore + 'static,
    {
        Self {
            contacts: store.clone(),
            follow_ups: store.clone(),
            teams: store.clone(),
            locations: store.clone(),
            outbreaks: store,
            clock,
        }
    }
}

pub struct FollowUpGenerator {
    deps: GenerationDeps,
    tuning: GenerationTuning,
    progress: Arc<dyn ProgressSink>,
}

impl FollowUpGenerator {
    pub fn new(deps: GenerationDeps, tuning: GenerationTuning, progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            deps,
            tuning,
            progress,
        }
    }

    pub async fn generate_followups(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ApiError> {
        let mut invalid = request.malformed_fields();
        if request.outbreak_id.trim().is_empty() {
            return Err(ApiError::InvalidParameters(invalid));
        }
        let outbreak = match self.deps.outbreaks.find_outbreak(&request.outbreak_id).await? {
            Some(outbreak) => outbreak,
            None if invalid.is_empty() => {
                return Err(ApiError::OutbreakNotFound(request.outbreak_id.clone()));
            }
            None => {
                invalid.insert(
                    0,
                    InvalidField::new(
                        "outbreak_id",
                        format!("no outbreak with id '{}'", request.outbreak_id),
                    ),
                );
                return Err(ApiError::InvalidParameters(invalid));
            }
        };

        let now = self.deps.clock.now();
        let today = now.date_naive();
        let params = request.validate(&outbreak, today)?;
        info!(
            outbreak_id = %outbreak.id,
            start = %params.period.start_date,
            end = %params.period.end_date,
            frequency_in_days = params.settings.frequency_in_days,
            follow_ups_per_day = params.settings.follow_ups_per_day,
            overwrite = params.settings.overwrite_existing,
            keep_team_assignment = params.settings.keep_team_assignment,
            algorithm = ?params.algorithm,
            "Follow-up generation started"
        );

        let teams = self.deps.teams.find_all_teams().await?;
        let index = TeamIndex::build(teams, self.deps.locations.as_ref()).await?;

        let query = EligibilityQuery::new(params.period, outbreak.id.clone())
            .with_contact_ids(request.contact_ids.clone());
        let source = EligibleContacts::new(Arc::clone(&self.deps.contacts), query);
        let queue = PersistenceQueue::new(Arc::clone(&self.deps.follow_ups), self.tuning.queue_config());
        let action = GeneratePage {
            follow_ups: Arc::clone(&self.deps.follow_ups),
            index: Arc::new(index),
            params: Arc::new(params),
            queue: &queue,
            today,
            now,
            concurrency: self.tuning.generation_concurrency.max(1),
        };
        let orchestrator = BatchOrchestrator::new(
            "generate_followups",
            self.tuning.contact_batch_config(),
        );

        let outcome = orchestrator
            .run(&source, BatchActions::whole_page(&action), self.progress.as_ref())
            .await;
        let summary = match outcome {
            Ok(summary) => summary,
            Err(err) => {
                let totals = queue.abandon().await;
                error!(
                    error = %err,
                    inserted = totals.inserted,
                    deleted = totals.deleted,
                    "Follow-up generation aborted"
                );
                return Err(ApiError::RunAborted {
                    inserted: totals.inserted,
                    deleted: totals.deleted,
                    source: Box::new(err),
                });
            }
        };

        match queue.drain_remaining().await {
            Ok(totals) => {
                info!(
                    contacts = summary.items_processed,
                    inserted = totals.inserted,
                    deleted = totals.deleted,
                    "Follow-up generation completed"
                );
                Ok(GenerateResponse {
                    count: totals.inserted,
                    deleted: totals.deleted,
                    contacts: summary.items_processed,
                })
            }
            Err(err) => {
                let totals = queue.totals();
                error!(error = %err, inserted = totals.inserted, "Final flush failed");
                Err(ApiError::RunAborted {
                    inserted: totals.inserted,
                    deleted: totals.deleted,
                    source: Box::new(err),
                })
            }
        }
    }
}

/// Whole-page action: plan every contact of the page and hand the result to the queue.
///
/// Contacts are planned on the blocking pool, at most `concurrency` at a time.
struct GeneratePage<'a> {
    follow_ups: Arc<dyn FollowUpStore>,
    index: Arc<TeamIndex>,
    params: Arc<RunParameters>,
    queue: &'a PersistenceQueue,
    today: NaiveDate,
    now: DateTime<Utc>,
    concurrency: usize,
}

fn plan_one(
    index: &TeamIndex,
    params: &RunParameters,
    contact: &Contact,
    existing: &[FollowUp],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> ContactPlan {
    let eligible = index.eligible_teams_for_contact(contact, params.algorithm);
    let current_team = contact
        .follow_up_team_id
        .as_ref()
        .filter(|team| index.contains_team(team));
    plan_contact(ContactPlanInput {
        contact,
        existing,
        eligible_teams: &eligible,
        current_team,
        period: params.period,
        settings: &params.settings,
        today,
        now,
    })
}

#[async_trait]
impl PageAction<Contact> for GeneratePage<'_> {
    async fn run_page(&self, page_no: usize, contacts: &[Contact]) -> Result<(), ApiError> {
        let ids: Vec<_> = contacts.iter().map(|c| c.id.clone()).collect();
        let mut existing = self
            .follow_ups
            .find_by_contact_ids_and_date_range(&ids, self.params.period)
            .await?;

        let tasks: Vec<_> = contacts
            .iter()
            .map(|contact| {
                let contact = contact.clone();
                let visits = existing.remove(&contact.id).unwrap_or_default();
                let index = Arc::clone(&self.index);
                let params = Arc::clone(&self.params);
                let (today, now) = (self.today, self.now);
                async move {
                    tokio::task::spawn_blocking(move || {
                        plan_one(&index, &params, &contact, &visits, today, now)
                    })
                    .await
                    .map_err(|e| ApiError::TaskFailed(format!("Contact planning panicked: {}", e)))
                }
            })
            .collect();
        let results: Vec<Result<ContactPlan, ApiError>> = stream::iter(tasks)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut merged = ContactPlan::default();
        for plan in results {
            merged.merge(plan?);
        }
        debug!(
            page = page_no,
            contacts = contacts.len(),
            to_add = merged.to_add.len(),
            to_remove = merged.to_remove.len(),
            "Page planned"
        );
        self.queue.enqueue_delete(merged.to_remove).await?;
        self.queue.enqueue_insert(merged.to_add).await?;
        Ok(())
    }
}
