use tracing::{debug, info, warn};

use crate::matching::{MatchMode, MatchPredicate};
use crate::operation::Operation;
use crate::store::RecordStore;
use crate::{CoreError, LedgerStore, NewRecord, Record, Repository, SENTINEL_KEY};

/// Application service keeping the per-key records and the repository blob in
/// sync.
///
/// Stateless between calls: every operation reads the ledger afresh and writes
/// back in full. The repository read-modify-write is not atomic, so concurrent
/// adds against the same ledger can lose one another's append.
pub struct RepositoryService<S: LedgerStore, M: MatchPredicate = MatchMode> {
    store: RecordStore<S>,
    matcher: M,
}

impl<S: LedgerStore> RepositoryService<S, MatchMode> {
    /// Service using the default substring id matching.
    pub fn new(ledger: S) -> Self {
        Self::with_matcher(ledger, MatchMode::Substring)
    }
}

impl<S: LedgerStore, M: MatchPredicate> RepositoryService<S, M> {
    pub fn with_matcher(ledger: S, matcher: M) -> Self {
        Self {
            store: RecordStore::new(ledger),
            matcher,
        }
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    /// Add a record: write it under its primary key, then append it to the
    /// repository.
    ///
    /// A failure after the keyed write is not rolled back; the keyed record and
    /// the repository then disagree.
    pub fn add_record(&self, input: NewRecord) -> Result<Record, CoreError> {
        let record = input.into_record();
        self.store.put_record(&record)?;
        self.append(record.clone())?;
        info!(
            key = %record.primary_key(),
            personal_id = record.personal_id,
            organization_id = record.organization_id,
            "record added"
        );
        Ok(record)
    }

    /// Set the comment on the first record whose personal id matches
    /// `personal_id`, store it, and append the updated copy to the repository.
    /// The earlier entry stays in the repository.
    pub fn update_comment(&self, personal_id: &str, comment: &str) -> Result<Record, CoreError> {
        let repo = self.store.get_repository()?;
        let Some(found) = repo
            .iter()
            .find(|r| self.matcher.matches(r.personal_id, personal_id))
        else {
            warn!(%personal_id, "update target not found");
            return Err(CoreError::RecordNotFound(format!(
                "no record matches personal id {}",
                personal_id
            )));
        };

        let mut updated = found.clone();
        updated.comment = comment.to_string();
        self.store.put_record(&updated)?;

        let mut repo = repo;
        repo.push(updated.clone());
        self.store.put_repository(&repo)?;
        info!(key = %updated.primary_key(), "comment updated");
        Ok(updated)
    }

    /// Records whose personal id matches `personal_id` or whose organization id
    /// matches `organization_id`, in insertion order.
    pub fn search_records(
        &self,
        personal_id: &str,
        organization_id: &str,
    ) -> Result<SearchResults<'_, M>, CoreError> {
        let repo = self.store.get_repository()?;
        let results = SearchResults {
            repo,
            personal_id: personal_id.to_string(),
            organization_id: organization_id.to_string(),
            matcher: &self.matcher,
        };
        debug!(%personal_id, %organization_id, matches = results.len(), "search");
        Ok(results)
    }

    /// Raw bytes under `key`, empty when absent.
    pub fn read_raw(&self, key: &str) -> Result<Vec<u8>, CoreError> {
        self.store.get_record(key)
    }

    pub fn write_raw(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.store.put_raw(key, value.as_bytes())
    }

    /// Seed the sentinel key with `value`.
    pub fn init(&self, value: &str) -> Result<(), CoreError> {
        self.store.put_raw(SENTINEL_KEY, value.as_bytes())?;
        info!("ledger initialized");
        Ok(())
    }

    /// Run a parsed operation and return its payload, if any.
    pub fn execute(&self, op: Operation) -> Result<Option<Vec<u8>>, CoreError> {
        debug!(operation = op.name(), read_only = op.is_read_only(), "execute");
        match op {
            Operation::Init { value } => self.init(&value).map(|_| None),
            Operation::Write { key, value } => self.write_raw(&key, &value).map(|_| None),
            Operation::Read { key } => self.read_raw(&key).map(Some),
            Operation::AddRecord(input) => {
                let record = self.add_record(input)?;
                to_payload(&record.primary_key(), &record).map(Some)
            }
            Operation::UpdateComment {
                personal_id,
                comment,
            } => {
                let record = self.update_comment(&personal_id, &comment)?;
                to_payload(&record.primary_key(), &record).map(Some)
            }
            Operation::Search {
                personal_id,
                organization_id,
            } => {
                let results = self.search_records(&personal_id, &organization_id)?;
                let matched: Vec<&Record> = results.iter().collect();
                to_payload("search", &matched).map(Some)
            }
        }
    }

    fn append(&self, record: Record) -> Result<(), CoreError> {
        let mut repo = self.store.get_repository()?;
        repo.push(record);
        self.store.put_repository(&repo)
    }
}

fn to_payload<T: serde::Serialize>(key: &str, value: &T) -> Result<Vec<u8>, CoreError> {
    serde_json::to_vec(value).map_err(|source| CoreError::Codec {
        key: key.to_string(),
        source,
    })
}

/// Lazy view over a repository snapshot. Each call to [`SearchResults::iter`]
/// restarts from the first record.
pub struct SearchResults<'a, M: MatchPredicate> {
    repo: Repository,
    personal_id: String,
    organization_id: String,
    matcher: &'a M,
}

impl<M: MatchPredicate> SearchResults<'_, M> {
    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        let matcher: &M = self.matcher;
        let personal_id = self.personal_id.as_str();
        let organization_id = self.organization_id.as_str();
        self.repo.iter().filter(move |r| {
            matcher.matches(r.personal_id, personal_id)
                || matcher.matches(r.organization_id, organization_id)
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn to_vec(&self) -> Vec<Record> {
        self.iter().cloned().collect()
    }
}
