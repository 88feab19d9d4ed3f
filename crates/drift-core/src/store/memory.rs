//! In-memory journal store.
//!
//! Same contract as [`SqliteStore`](super::SqliteStore), backed by a
//! `BTreeMap`. Used by unit and property tests, and by hosts that want a
//! throwaway journal with no file on disk.

use std::collections::BTreeMap;

use super::{JournalStore, StoreError};
use crate::model::{ChangeAction, EntityKind, PendingChange};

/// Volatile journal store keyed by `(id, kind)`.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    rows: BTreeMap<(i64, EntityKind), ChangeAction>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl JournalStore for MemoryStore {
    fn get(&self, id: i64, kind: EntityKind) -> Result<Option<PendingChange>, StoreError> {
        Ok(self
            .rows
            .get(&(id, kind))
            .map(|action| PendingChange::new(id, kind, *action)))
    }

    fn insert(&mut self, change: &PendingChange) -> Result<(), StoreError> {
        let key = (change.id, change.kind);
        if self.rows.contains_key(&key) {
            return Err(StoreError::Duplicate {
                id: change.id,
                kind: change.kind,
            });
        }
        self.rows.insert(key, change.action);
        Ok(())
    }

    fn delete(&mut self, id: i64, kind: EntityKind) -> Result<(), StoreError> {
        self.rows.remove(&(id, kind));
        Ok(())
    }

    fn all(&self) -> Result<Vec<PendingChange>, StoreError> {
        Ok(self
            .rows
            .iter()
            .map(|((id, kind), action)| PendingChange::new(*id, *kind, *action))
            .collect())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.rows.clear();
        Ok(())
    }
}
