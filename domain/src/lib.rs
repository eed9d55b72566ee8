//! Domain library for the work-record ledger.
//!
//! Holds the record types, the ledger port (trait), and error definitions.
//! Concrete ledger backends live in adapter crates; only the in-memory ledger
//! used by tests and demos ships here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::operation::EntryPoint;

/// Fixed ledger key under which the full record collection is persisted.
pub const REPOSITORY_KEY: &str = "RecordRepository";

/// Ledger key seeded by the `init` operation.
pub const SENTINEL_KEY: &str = "hello_Block";

/// One employee work-entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub personal_id: i64,
    pub organization_id: i64,
    pub name: String,
    pub work_date: String,
    pub hours: i64,
    #[serde(default)]
    pub comment: String,
}

impl Record {
    /// Composite key used for direct lookups: `personalId_organizationId_workDate`.
    pub fn primary_key(&self) -> String {
        primary_key(self.personal_id, self.organization_id, &self.work_date)
    }
}

/// Build a primary key from its parts.
pub fn primary_key(personal_id: i64, organization_id: i64, work_date: &str) -> String {
    format!("{}_{}_{}", personal_id, organization_id, work_date)
}

/// Input data for adding a record. Values are validated but not yet normalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRecord {
    pub personal_id: i64,
    pub organization_id: i64,
    pub name: String,
    pub work_date: String,
    pub hours: i64,
    pub comment: Option<String>,
}

impl NewRecord {
    /// Normalize into a stored record: `name` and `work_date` are lower-cased.
    pub fn into_record(self) -> Record {
        Record {
            personal_id: self.personal_id,
            organization_id: self.organization_id,
            name: self.name.to_lowercase(),
            work_date: self.work_date.to_lowercase(),
            hours: self.hours,
            comment: self.comment.unwrap_or_default(),
        }
    }
}

/// Denormalized collection of every record ever written, in write order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub records: Vec<Record>,
}

impl Repository {
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

/// Failure reported by a ledger backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new<S: Into<String>>(msg: S) -> Self {
        Self(msg.into())
    }
}

/// Ledger port: atomic get/put per single key, no multi-key transactions.
pub trait LedgerStore: Send + Sync {
    /// Bytes stored under `key`, or `None` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("record not found: {0}")]
    RecordNotFound(String),
    #[error("received unknown function {entry}: {name}")]
    UnknownFunction { entry: EntryPoint, name: String },
    #[error("failed to get state for {key}: {source}")]
    StoreRead {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to put state for {key}: {source}")]
    StoreWrite {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("malformed state under {key}: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub mod adapters;
pub mod matching;
pub mod operation;
pub mod service;
pub mod store;
pub mod validate;
