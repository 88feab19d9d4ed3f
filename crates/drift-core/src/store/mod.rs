//! Journal storage seam.
//!
//! The reconciliation engine only needs five keyed operations; everything
//! behind them (SQLite, in-memory) is interchangeable. Key uniqueness is
//! enforced by the store itself: [`JournalStore::insert`] must fail on an
//! occupied key rather than overwrite.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::model::{ChangeAction, EntityKind, PendingChange};

/// Errors surfaced by a journal store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying SQLite database failed.
    #[error("journal database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An insert hit an occupied `(id, kind)` key.
    #[error("a pending change already exists for {kind} {id}")]
    Duplicate { id: i64, kind: EntityKind },

    /// A stored row held a token this build does not understand.
    #[error("unrecognized {field} token '{value}' in the journal table")]
    CorruptRow {
        field: &'static str,
        value: String,
    },
}

/// Keyed persistence for [`PendingChange`] records.
///
/// Implementations must enforce at most one record per `(id, kind)` pair.
pub trait JournalStore {
    /// Fetch the pending record for a key, or `None` when there is none.
    /// Absence is not an error.
    fn get(&self, id: i64, kind: EntityKind) -> Result<Option<PendingChange>, StoreError>;

    /// Persist a new record. Fails with [`StoreError::Duplicate`] when the
    /// key is already occupied.
    fn insert(&mut self, change: &PendingChange) -> Result<(), StoreError>;

    /// Remove the record for a key. No-op when the key is empty.
    fn delete(&mut self, id: i64, kind: EntityKind) -> Result<(), StoreError>;

    /// Unordered snapshot of every pending record.
    fn all(&self) -> Result<Vec<PendingChange>, StoreError>;

    /// Drop every pending record.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Shared helper for stores that persist tokens as text: decode one
/// `(id, kind, action)` row back into a record.
pub(crate) fn decode_tokens(
    id: i64,
    kind: &str,
    action: &str,
) -> Result<PendingChange, StoreError> {
    let kind: EntityKind = kind.parse().map_err(|_| StoreError::CorruptRow {
        field: "entity_kind",
        value: kind.to_string(),
    })?;
    let action: ChangeAction = action.parse().map_err(|_| StoreError::CorruptRow {
        field: "action",
        value: action.to_string(),
    })?;
    Ok(PendingChange { id, kind, action })
}
