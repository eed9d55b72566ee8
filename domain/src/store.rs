//! Typed access to the ledger: records by primary key and the full repository
//! blob under [`REPOSITORY_KEY`].

use serde::Serialize;
use tracing::debug;

use crate::{CoreError, LedgerStore, Record, Repository, REPOSITORY_KEY};

/// Translates between record values and the byte-oriented ledger primitives.
pub struct RecordStore<S: LedgerStore> {
    ledger: S,
}

impl<S: LedgerStore> RecordStore<S> {
    pub fn new(ledger: S) -> Self {
        Self { ledger }
    }

    /// Underlying ledger handle.
    pub fn ledger(&self) -> &S {
        &self.ledger
    }

    /// Serialize `record` and write it under its primary key.
    pub fn put_record(&self, record: &Record) -> Result<(), CoreError> {
        let key = record.primary_key();
        let bytes = encode(&key, record)?;
        self.put_raw(&key, &bytes)?;
        debug!(%key, "record stored");
        Ok(())
    }

    /// Raw bytes stored under `key`; empty when the key was never written.
    ///
    /// Decoding is left to the caller.
    pub fn get_record(&self, key: &str) -> Result<Vec<u8>, CoreError> {
        Ok(self.get_raw(key)?.unwrap_or_default())
    }

    /// Decode the record under `key`, `None` when absent.
    pub fn load_record(&self, key: &str) -> Result<Option<Record>, CoreError> {
        match self.get_raw(key)? {
            Some(bytes) if !bytes.is_empty() => decode(key, &bytes).map(Some),
            _ => Ok(None),
        }
    }

    /// Serialize the whole collection and write it under [`REPOSITORY_KEY`].
    pub fn put_repository(&self, repo: &Repository) -> Result<(), CoreError> {
        let bytes = encode(REPOSITORY_KEY, repo)?;
        self.put_raw(REPOSITORY_KEY, &bytes)?;
        debug!(records = repo.len(), bytes = bytes.len(), "repository stored");
        Ok(())
    }

    /// Load the collection. A key that was never written (or holds no bytes)
    /// yields an empty repository.
    pub fn get_repository(&self) -> Result<Repository, CoreError> {
        match self.get_raw(REPOSITORY_KEY)? {
            Some(bytes) if !bytes.is_empty() => decode(REPOSITORY_KEY, &bytes),
            _ => Ok(Repository::default()),
        }
    }

    pub fn put_raw(&self, key: &str, value: &[u8]) -> Result<(), CoreError> {
        self.ledger
            .put(key, value)
            .map_err(|source| CoreError::StoreWrite {
                key: key.to_string(),
                source,
            })
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        self.ledger.get(key).map_err(|source| CoreError::StoreRead {
            key: key.to_string(),
            source,
        })
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, CoreError> {
    serde_json::to_vec(value).map_err(|source| CoreError::Codec {
        key: key.to_string(),
        source,
    })
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, CoreError> {
    serde_json::from_slice(bytes).map_err(|source| CoreError::Codec {
        key: key.to_string(),
        source,
    })
}
