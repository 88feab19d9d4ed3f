//! Snapshot export and bulk import.
//!
//! A snapshot is the full unordered set of pending records, serialized as
//! JSON. Import is a raw bulk load: records go straight through
//! [`insert`](crate::store::JournalStore::insert) with **no reconciliation**,
//! so the caller owns the uniqueness invariant; loading into a non-empty
//! journal surfaces the store's duplicate error.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::journal::Journal;
use crate::model::PendingChange;
use crate::store::{JournalStore, StoreError};

/// Errors surfaced while exporting or importing a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The store failed while reading or loading records.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The snapshot could not be serialized or deserialized.
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Serde container for an exported journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every pending record at export time, order irrelevant.
    pub pending: Vec<PendingChange>,
}

impl<S: JournalStore> Journal<S> {
    /// Write the full pending set to `writer` as pretty JSON.
    ///
    /// Returns the number of records exported.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or serialization fails.
    pub fn export<W: Write>(&self, writer: W) -> Result<usize, SnapshotError> {
        let snapshot = Snapshot {
            pending: self.store.all()?,
        };
        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(snapshot.pending.len())
    }

    /// Bulk-load a snapshot, inserting each record raw.
    ///
    /// Returns the number of records imported.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot fails to parse or any insert fails;
    /// a duplicate key aborts the load at that record.
    pub fn import<R: Read>(&mut self, reader: R) -> Result<usize, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        for record in &snapshot.pending {
            self.store.insert(record)?;
        }
        Ok(snapshot.pending.len())
    }
}
