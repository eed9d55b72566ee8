//! sqlite-adapter — SQLite implementation of the `LedgerStore` port.
//!
//! Purpose
//! - Provide a lightweight, file-based ledger so the service runs locally
//!   without an external ledger platform.
//! - Every key lives in a single `ledger_state` table; `put` is an upsert.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Each call is its own statement, so atomicity holds per key only.

use std::path::Path;
use std::sync::Mutex;

use domain::{LedgerStore, StoreError};
use rusqlite::{params, Connection};
use tracing::debug;

/// SQLite-backed ledger.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Construct from env var `DB_PATH` (defaults to `./data/ledger.db`).
    pub fn from_env() -> Result<Self, StoreError> {
        let path = std::env::var("DB_PATH").unwrap_or_else(|_| "./data/ledger.db".to_string());
        Self::open_creating_dirs(path)
    }

    /// Open at `path`, creating missing parent directories first.
    pub fn open_creating_dirs<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| StoreError::new(format!("cannot create {}: {e}", dir.display())))?;
            }
        }
        Self::new(path)
    }

    /// Number of keys stored.
    pub fn key_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::new("mutex poisoned"))?;
        conn.query_row("SELECT COUNT(*) FROM ledger_state", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as u64)
        .map_err(map_sqerr)
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS ledger_state (
            key TEXT PRIMARY KEY,
            value BLOB NOT NULL
        );
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::new(format!("sqlite error: {e}"))
}

impl LedgerStore for SqliteLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::new("mutex poisoned"))?;
        let mut stmt = conn
            .prepare("SELECT value FROM ledger_state WHERE key = ?1")
            .map_err(map_sqerr)?;
        let mut rows = stmt.query(params![key]).map_err(map_sqerr)?;
        if let Some(row) = rows.next().map_err(map_sqerr)? {
            let value: Vec<u8> = row.get(0).map_err(map_sqerr)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::new("mutex poisoned"))?;
        conn.execute(
            "INSERT INTO ledger_state(key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(map_sqerr)?;
        debug!(%key, bytes = value.len(), "sqlite put");
        Ok(())
    }
}
