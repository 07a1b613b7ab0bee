//! Sled-backed implementation of every collaborator store.

use crate::eligibility::EligibilityQuery;
use crate::error::StorageError;
use crate::model::{
    Contact, Dataset, FollowUp, FollowUpFilter, FollowUpPatch, GenerationPeriod, Location,
    Outbreak, Team,
};
use crate::store::{
    ContactStore, FollowUpStore, LocationService, OutbreakStore, PageRequest, TeamStore,
};
use crate::types::{ContactId, FollowUpId, LocationId, OutbreakId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
};
use sled::{Db, Transactional, Tree};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::ops::Bound;
use std::path::Path;
use tracing::{debug, info};

const TREE_CONTACTS: &str = "contacts";
const TREE_FOLLOW_UPS: &str = "follow_ups";
const TREE_FOLLOW_UPS_BY_CONTACT: &str = "follow_ups_by_contact";
const TREE_TEAMS: &str = "teams";
const TREE_LOCATIONS: &str = "locations";
const TREE_OUTBREAKS: &str = "outbreaks";

/// One sled database holding contacts, visits, teams, locations and outbreaks.
///
/// Visits are additionally indexed under `contact_id \0 date \0 id` so that per-contact date
/// range lookups are prefix scans.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    contacts: Tree,
    follow_ups: Tree,
    follow_ups_by_contact: Tree,
    teams: Tree,
    locations: Tree,
    outbreaks: Tree,
}

impl SledStore {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::from_db(sled::open(path)?)
    }

    /// In-memory database removed on drop.
    pub fn temporary() -> Result<Self, StorageError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    pub fn from_db(db: Db) -> Result<Self, StorageError> {
        Ok(Self {
            contacts: db.open_tree(TREE_CONTACTS)?,
            follow_ups: db.open_tree(TREE_FOLLOW_UPS)?,
            follow_ups_by_contact: db.open_tree(TREE_FOLLOW_UPS_BY_CONTACT)?,
            teams: db.open_tree(TREE_TEAMS)?,
            locations: db.open_tree(TREE_LOCATIONS)?,
            outbreaks: db.open_tree(TREE_OUTBREAKS)?,
            db,
        })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub async fn flush(&self) -> Result<(), StorageError> {
        self.db.flush_async().await?;
        Ok(())
    }

    /// Write every record of `dataset`, replacing records with the same id.
    pub fn import(&self, dataset: &Dataset) -> Result<(), StorageError> {
        for outbreak in &dataset.outbreaks {
            put(&self.outbreaks, &outbreak.id, outbreak)?;
        }
        for location in &dataset.locations {
            put(&self.locations, &location.id, location)?;
        }
        for team in &dataset.teams {
            put(&self.teams, &team.id, team)?;
        }
        for contact in &dataset.contacts {
            put(&self.contacts, &contact.id, contact)?;
        }
        self.write_follow_ups(&dataset.follow_ups)?;
        info!(
            outbreaks = dataset.outbreaks.len(),
            locations = dataset.locations.len(),
            teams = dataset.teams.len(),
            contacts = dataset.contacts.len(),
            follow_ups = dataset.follow_ups.len(),
            "Dataset imported"
        );
        Ok(())
    }

    pub fn import_json(&self, raw: &str) -> Result<(), StorageError> {
        let dataset: Dataset = serde_json::from_str(raw)?;
        self.import(&dataset)
    }

    /// Visits matching `filter`, ordered by contact, date and creation time.
    pub fn list_follow_ups(&self, filter: &FollowUpFilter) -> Result<Vec<FollowUp>, StorageError> {
        let mut out = self.scan_follow_ups(filter)?;
        out.sort_by(|a, b| {
            (&a.contact_id, a.date, a.created_at, &a.id)
                .cmp(&(&b.contact_id, b.date, b.created_at, &b.id))
        });
        Ok(out)
    }

    /// Records and index entries change in one transaction; a replaced record drops its old
    /// index entry.
    fn write_follow_ups(&self, follow_ups: &[FollowUp]) -> Result<usize, StorageError> {
        let encoded = follow_ups
            .iter()
            .map(|follow_up| Ok((follow_up, bincode::serialize(follow_up)?)))
            .collect::<Result<Vec<_>, StorageError>>()?;
        (&self.follow_ups, &self.follow_ups_by_contact)
            .transaction(|(records, index)| -> ConflictableTransactionResult<(), StorageError> {
                for (follow_up, raw) in &encoded {
                    if let Some(previous) = records.insert(follow_up.id.as_bytes(), raw.as_slice())? {
                        let previous: FollowUp = bincode::deserialize(&previous).map_err(abort)?;
                        index.remove(contact_index_key(&previous))?;
                    }
                    index.insert(contact_index_key(follow_up), follow_up.id.as_bytes())?;
                }
                Ok(())
            })
            .map_err(from_transaction)?;
        Ok(follow_ups.len())
    }

    fn get_follow_up(&self, id: &str) -> Result<Option<FollowUp>, StorageError> {
        get(&self.follow_ups, id)
    }

    /// Visits of one contact through the index, optionally bounded to a period. Index entries
    /// that no longer describe their record are skipped, so each visit appears once.
    fn follow_ups_of_contact(
        &self,
        contact_id: &str,
        period: Option<GenerationPeriod>,
    ) -> Result<Vec<FollowUp>, StorageError> {
        let entries = match period {
            Some(period) => self.follow_ups_by_contact.range::<Vec<u8>, _>((
                Bound::Included(contact_date_key(contact_id, period.start_date)),
                Bound::Excluded(contact_date_upper_bound(contact_id, period.end_date)),
            )),
            None => {
                let mut prefix = contact_id.as_bytes().to_vec();
                prefix.push(0);
                self.follow_ups_by_contact.scan_prefix(prefix)
            }
        };
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for entry in entries {
            let (key, id) = entry?;
            let Some(raw) = self.follow_ups.get(&id)? else {
                continue;
            };
            let follow_up: FollowUp = bincode::deserialize(&raw)?;
            if &key[..] != contact_index_key(&follow_up).as_slice() {
                debug!(follow_up_id = %follow_up.id, "Skipping stale index entry");
                continue;
            }
            if seen.insert(follow_up.id.clone()) {
                out.push(follow_up);
            }
        }
        Ok(out)
    }

    fn scan_follow_ups(&self, filter: &FollowUpFilter) -> Result<Vec<FollowUp>, StorageError> {
        let candidates = match &filter.contact_ids {
            Some(contact_ids) => {
                let mut out = Vec::new();
                for contact_id in contact_ids {
                    out.extend(self.follow_ups_of_contact(contact_id, None)?);
                }
                out
            }
            None => values::<FollowUp>(&self.follow_ups)?,
        };
        Ok(candidates
            .into_iter()
            .filter(|fu| filter.matches(fu))
            .collect())
    }

    /// Feeds eligible contacts to `visit` in id order, starting after `after` when given, until
    /// `visit` returns false.
    fn scan_eligible(
        &self,
        query: &EligibilityQuery,
        after: Option<&str>,
        mut visit: impl FnMut(Contact) -> bool,
    ) -> Result<(), StorageError> {
        match &query.contact_ids {
            Some(ids) => {
                let unique: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
                for id in unique.into_iter().filter(|id| after.map_or(true, |a| *id > a)) {
                    if let Some(contact) = get::<Contact>(&self.contacts, id)? {
                        if query.matches(&contact) && !visit(contact) {
                            break;
                        }
                    }
                }
            }
            None => {
                let lower = match after {
                    Some(id) => Bound::Excluded(id.as_bytes().to_vec()),
                    None => Bound::Unbounded,
                };
                for entry in self.contacts.range::<Vec<u8>, _>((lower, Bound::Unbounded)) {
                    let (_, raw) = entry?;
                    let contact: Contact = bincode::deserialize(&raw)?;
                    if query.matches(&contact) && !visit(contact) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

fn abort<E: Into<StorageError>>(err: E) -> ConflictableTransactionError<StorageError> {
    ConflictableTransactionError::Abort(err.into())
}

fn from_transaction(err: TransactionError<StorageError>) -> StorageError {
    match err {
        TransactionError::Abort(err) => err,
        TransactionError::Storage(err) => StorageError::Backend(err),
    }
}

/// `contact \0 date`, the first index key of that contact and day.
fn contact_date_key(contact_id: &str, date: NaiveDate) -> Vec<u8> {
    format!("{}\0{}", contact_id, date.format("%Y-%m-%d")).into_bytes()
}

/// Just past every index key of that contact and day.
fn contact_date_upper_bound(contact_id: &str, date: NaiveDate) -> Vec<u8> {
    let mut key = contact_date_key(contact_id, date);
    key.push(1);
    key
}

fn contact_index_key(follow_up: &FollowUp) -> Vec<u8> {
    format!(
        "{}\0{}\0{}",
        follow_up.contact_id,
        follow_up.date.format("%Y-%m-%d"),
        follow_up.id
    )
    .into_bytes()
}

fn put<T: Serialize>(tree: &Tree, key: &str, value: &T) -> Result<(), StorageError> {
    tree.insert(key.as_bytes(), bincode::serialize(value)?)?;
    Ok(())
}

fn get<T: DeserializeOwned>(tree: &Tree, key: &str) -> Result<Option<T>, StorageError> {
    match tree.get(key.as_bytes())? {
        Some(raw) => Ok(Some(bincode::deserialize(&raw)?)),
        None => Ok(None),
    }
}

fn values<T: DeserializeOwned>(tree: &Tree) -> Result<Vec<T>, StorageError> {
    let mut out = Vec::new();
    for entry in tree.iter() {
        let (_, raw) = entry?;
        out.push(bincode::deserialize(&raw)?);
    }
    Ok(out)
}

#[async_trait]
impl ContactStore for SledStore {
    async fn count_eligible_contacts(
        &self,
        query: &EligibilityQuery,
    ) -> Result<usize, StorageError> {
        let mut count = 0usize;
        self.scan_eligible(query, None, |_| {
            count += 1;
            true
        })?;
        Ok(count)
    }

    async fn find_eligible_contacts(
        &self,
        query: &EligibilityQuery,
        page: PageRequest,
    ) -> Result<Vec<Contact>, StorageError> {
        let mut out = Vec::new();
        if page.page_size == 0 {
            return Ok(out);
        }
        let mut skip = match page.after {
            Some(_) => 0,
            None => page.offset(),
        };
        self.scan_eligible(query, page.after.as_deref(), |contact| {
            if skip > 0 {
                skip -= 1;
                return true;
            }
            out.push(contact);
            out.len() < page.page_size
        })?;
        Ok(out)
    }
}

#[async_trait]
impl FollowUpStore for SledStore {
    async fn find_by_contact_ids_and_date_range(
        &self,
        contact_ids: &[ContactId],
        period: GenerationPeriod,
    ) -> Result<HashMap<ContactId, Vec<FollowUp>>, StorageError> {
        let mut out = HashMap::new();
        for contact_id in contact_ids {
            let mut visits: Vec<FollowUp> = self
                .follow_ups_of_contact(contact_id, Some(period))?
                .into_iter()
                .filter(|fu| period.contains(fu.date))
                .collect();
            visits.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
            if !visits.is_empty() {
                out.insert(contact_id.clone(), visits);
            }
        }
        Ok(out)
    }

    async fn bulk_insert(&self, follow_ups: Vec<FollowUp>) -> Result<usize, StorageError> {
        let written = self.write_follow_ups(&follow_ups)?;
        debug!(count = written, "Bulk inserted follow-ups");
        Ok(written)
    }

    async fn bulk_delete_by_ids(&self, ids: &[FollowUpId]) -> Result<usize, StorageError> {
        let removed = (&self.follow_ups, &self.follow_ups_by_contact)
            .transaction(|(records, index)| -> ConflictableTransactionResult<usize, StorageError> {
                let mut removed = 0usize;
                for id in ids {
                    if let Some(raw) = records.remove(id.as_bytes())? {
                        let follow_up: FollowUp = bincode::deserialize(&raw).map_err(abort)?;
                        index.remove(contact_index_key(&follow_up))?;
                        removed += 1;
                    }
                }
                Ok(removed)
            })
            .map_err(from_transaction)?;
        debug!(requested = ids.len(), removed, "Bulk deleted follow-ups");
        Ok(removed)
    }

    async fn find_ids_matching(
        &self,
        filter: &FollowUpFilter,
    ) -> Result<Vec<FollowUpId>, StorageError> {
        let mut ids: Vec<FollowUpId> = self
            .scan_follow_ups(filter)?
            .into_iter()
            .map(|fu| fu.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn find_by_ids(&self, ids: &[FollowUpId]) -> Result<Vec<FollowUp>, StorageError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(follow_up) = self.get_follow_up(id)? {
                out.push(follow_up);
            }
        }
        Ok(out)
    }

    async fn update_follow_up(
        &self,
        id: &FollowUpId,
        patch: &FollowUpPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<FollowUp>, StorageError> {
        let Some(mut follow_up) = self.get_follow_up(id)? else {
            return Ok(None);
        };
        follow_up.apply_patch(patch, now);
        put(&self.follow_ups, id, &follow_up)?;
        Ok(Some(follow_up))
    }
}

#[async_trait]
impl TeamStore for SledStore {
    async fn find_all_teams(&self) -> Result<Vec<Team>, StorageError> {
        values(&self.teams)
    }
}

#[async_trait]
impl LocationService for SledStore {
    async fn expand_to_descendants(
        &self,
        location_ids: &[LocationId],
    ) -> Result<Vec<LocationId>, StorageError> {
        let mut children: HashMap<LocationId, Vec<LocationId>> = HashMap::new();
        for location in values::<Location>(&self.locations)? {
            if let Some(parent) = location.parent_id {
                children.entry(parent).or_default().push(location.id);
            }
        }

        let mut seen: BTreeSet<LocationId> = BTreeSet::new();
        let mut queue: VecDeque<LocationId> = location_ids.iter().cloned().collect();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(kids) = children.get(&id) {
                queue.extend(kids.iter().cloned());
            }
        }
        Ok(seen.into_iter().collect())
    }
}

#[async_trait]
impl OutbreakStore for SledStore {
    async fn find_outbreak(&self, id: &OutbreakId) -> Result<Option<Outbreak>, StorageError> {
        get(&self.outbreaks, id)
    }
}
