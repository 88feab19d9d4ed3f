//! SQLite-backed journal store.
//!
//! Runtime defaults are intentionally conservative:
//! - `journal_mode = WAL` to allow concurrent readers while the writer works
//! - `busy_timeout = 5s` to reduce transient lock failures under contention
//! - `foreign_keys = ON` kept on even though the journal is a single table
//!
//! Schema versioning rides on `PRAGMA user_version`; migrations apply in
//! ascending transactional steps and are idempotent (`IF NOT EXISTS` DDL).

use anyhow::{Context, Result};
use rusqlite::{Connection, params, types::Type};
use std::{path::Path, time::Duration};

use super::{JournalStore, StoreError, decode_tokens};
use crate::model::{EntityKind, PendingChange};

/// Busy timeout used for journal DB connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 1;

/// Migration v1: the keyed pending-change table.
///
/// The primary key *is* the at-most-one-record invariant: a second insert
/// for the same `(entity_id, entity_kind)` fails at the storage layer.
const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS pending_changes (
    entity_id INTEGER NOT NULL,
    entity_kind TEXT NOT NULL
        CHECK (entity_kind IN ('appointment', 'task', 'subtask', 'project')),
    action TEXT NOT NULL
        CHECK (action IN ('add', 'change', 'delete')),
    PRIMARY KEY (entity_id, entity_kind)
);
";

const MIGRATIONS: &[(u32, &str)] = &[(1, MIGRATION_V1_SQL)];

/// Read `PRAGMA user_version` and convert it to a Rust `u32`.
///
/// # Errors
///
/// Returns an error if querying SQLite fails or the version value cannot be
/// represented as `u32`.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Apply all pending migrations in ascending order.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let mut current = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", i64::from(*version))?;
        tx.commit()?;
        current = *version;
    }

    Ok(current)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

/// Journal store persisted in a SQLite database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the journal database, apply runtime pragmas, and
    /// migrate schema to the latest version.
    ///
    /// # Errors
    ///
    /// Returns an error if opening/configuring/migrating the database fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create journal db directory {}", parent.display()))?;
        }

        let mut conn = Connection::open(path)
            .with_context(|| format!("open journal database {}", path.display()))?;

        configure_connection(&conn).context("configure sqlite pragmas")?;
        migrate(&mut conn).context("apply journal migrations")?;

        Ok(Self { conn })
    }

    /// Open a throwaway in-memory journal database.
    ///
    /// # Errors
    ///
    /// Returns an error if configuring or migrating the database fails.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().context("open in-memory journal database")?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .context("configure sqlite busy timeout")?;
        migrate(&mut conn).context("apply journal migrations")?;
        Ok(Self { conn })
    }

    /// Borrow the underlying connection (read-only diagnostics).
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl JournalStore for SqliteStore {
    fn get(&self, id: i64, kind: EntityKind) -> Result<Option<PendingChange>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_id, entity_kind, action
             FROM pending_changes
             WHERE entity_id = ?1 AND entity_kind = ?2",
        )?;
        let mut rows = stmt.query(params![id, kind.as_str()])?;

        match rows.next()? {
            Some(row) => {
                let id: i64 = row.get(0)?;
                let kind: String = row.get(1)?;
                let action: String = row.get(2)?;
                Ok(Some(decode_tokens(id, &kind, &action)?))
            }
            None => Ok(None),
        }
    }

    fn insert(&mut self, change: &PendingChange) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO pending_changes (entity_id, entity_kind, action)
                 VALUES (?1, ?2, ?3)",
                params![change.id, change.kind.as_str(), change.action.as_str()],
            )
            .map_err(|err| match err {
                rusqlite::Error::SqliteFailure(e, _)
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StoreError::Duplicate {
                        id: change.id,
                        kind: change.kind,
                    }
                }
                other => StoreError::Database(other),
            })?;
        Ok(())
    }

    fn delete(&mut self, id: i64, kind: EntityKind) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM pending_changes WHERE entity_id = ?1 AND entity_kind = ?2",
            params![id, kind.as_str()],
        )?;
        Ok(())
    }

    fn all(&self) -> Result<Vec<PendingChange>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT entity_id, entity_kind, action FROM pending_changes")?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let kind: String = row.get(1)?;
            let action: String = row.get(2)?;
            out.push(decode_tokens(id, &kind, &action)?);
        }
        Ok(out)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM pending_changes", [])?;
        Ok(())
    }
}
