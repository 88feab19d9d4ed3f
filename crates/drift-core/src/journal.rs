//! The pending-change journal and its reconciliation engine.
//!
//! [`Journal`] owns a [`JournalStore`] and folds every incoming mutation into
//! at most one net-change record per `(id, kind)` key. Sequences collapse to
//! their net effect: add-then-delete cancels outright, change-then-delete
//! leaves a delete, delete-then-add leaves a change (the entity exists on the
//! remote but differs from it).
//!
//! Reconciliation is single-writer: every reconciling operation takes
//! `&mut self`, so the lookup/decide/write cycle for one event can never
//! interleave with another on the same journal.

use crate::config::JournalConfig;
use crate::model::{ChangeAction, EntityKind, PendingChange};
use crate::notify::{ChangeFeed, ModelEvent};
use crate::store::{JournalStore, SqliteStore, StoreError};

/// What the merge-rule table decided for one incoming change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeAction {
    /// Keep the existing record untouched.
    Keep,
    /// Remove the existing record; the net effect is nothing to sync.
    Drop,
    /// Swap the existing record for one with the given action.
    Replace(ChangeAction),
}

/// The merge-rule table: existing kind x incoming kind.
///
/// Any pairing not listed is a deliberate no-op; the journal never guesses
/// at an action it cannot justify.
const fn merge(existing: ChangeAction, incoming: ChangeAction) -> MergeAction {
    match (existing, incoming) {
        // Created and deleted between syncs: the remote never needs to know.
        (ChangeAction::Add, ChangeAction::Delete) => MergeAction::Drop,
        // Changed then deleted: the remote only needs the delete.
        (ChangeAction::Change, ChangeAction::Delete) => {
            MergeAction::Replace(ChangeAction::Delete)
        }
        // Deleted then recreated: the remote already has it, but stale.
        (ChangeAction::Delete, ChangeAction::Add) => MergeAction::Replace(ChangeAction::Change),
        _ => MergeAction::Keep,
    }
}

/// Pairings a well-behaved notifier never produces. Kept as no-ops, but
/// flagged so anomalies show up in logs instead of being silently absorbed.
const fn unexpected_pairing(existing: ChangeAction, incoming: ChangeAction) -> bool {
    matches!(
        (existing, incoming),
        (ChangeAction::Add, ChangeAction::Add)
            | (ChangeAction::Change, ChangeAction::Add)
            | (ChangeAction::Delete, ChangeAction::Delete)
            | (ChangeAction::Delete, ChangeAction::Change)
    )
}

/// How one observed event landed in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event carried nothing reconcilable, or an untracked kind.
    Ignored,
    /// First event for its key: a fresh record was inserted.
    Recorded(ChangeAction),
    /// The existing record already captures the net effect.
    Unchanged,
    /// The existing record was removed; nothing left to sync for the key.
    Collapsed,
    /// The existing record was swapped for one with this action.
    Rewritten(ChangeAction),
}

/// Errors surfaced while reconciling one event.
///
/// All failures are per-event: the journal stays usable for other keys.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// The store failed during lookup, insert, or delete.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A replace lost its insert half: the old record was deleted but the
    /// replacement insert failed, leaving the key with no pending record.
    /// This under-reports (a missed sync) rather than leaving a stale record.
    #[error("replace for {kind} {id} dropped the old record but failed to insert '{action}'")]
    ReplaceInterrupted {
        id: i64,
        kind: EntityKind,
        action: ChangeAction,
        #[source]
        source: StoreError,
    },
}

/// Counters returned after draining a change feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Events reconciled into the journal (including merge no-ops).
    pub reconciled: usize,
    /// Events with nothing reconcilable or an untracked kind.
    pub ignored: usize,
    /// Events that failed against the store (logged and skipped).
    pub errors: usize,
}

/// The pending-change journal.
///
/// Construct one at the composition root and hand it to whatever consumes
/// it; there is no global instance.
pub struct Journal<S> {
    pub(crate) store: S,
    tracked: Vec<EntityKind>,
}

impl Journal<SqliteStore> {
    /// Open a SQLite-backed journal as configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &JournalConfig) -> anyhow::Result<Self> {
        let store = SqliteStore::open(&config.db_path)?;
        Ok(Self::tracking(store, &config.tracked))
    }
}

impl<S: JournalStore> Journal<S> {
    /// Build a journal tracking all four entity kinds.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::tracking(store, &EntityKind::ALL)
    }

    /// Build a journal tracking only the given kinds; events for any other
    /// kind are ignored.
    #[must_use]
    pub fn tracking(store: S, kinds: &[EntityKind]) -> Self {
        Self {
            store,
            tracked: kinds.to_vec(),
        }
    }

    /// Reconcile one model event.
    ///
    /// Events with a missing entity or action, or for an untracked kind,
    /// return [`Outcome::Ignored`] without touching the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails; see [`JournalError`].
    pub fn observe(&mut self, event: &ModelEvent) -> Result<Outcome, JournalError> {
        let Some((id, kind, action)) = event.normalize() else {
            tracing::debug!("ignoring model event with no entity or action");
            return Ok(Outcome::Ignored);
        };

        if !self.tracked.contains(&kind) {
            tracing::debug!(id, kind = %kind, "ignoring event for untracked entity kind");
            return Ok(Outcome::Ignored);
        }

        self.record(id, kind, action)
    }

    /// Reconcile one normalized `(id, kind, action)` triple.
    ///
    /// Looks up the existing record for the key, applies the merge-rule
    /// table, and writes the result. Replace is delete-then-insert; when the
    /// insert half fails the key is left empty and
    /// [`JournalError::ReplaceInterrupted`] reports it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails; see [`JournalError`].
    pub fn record(
        &mut self,
        id: i64,
        kind: EntityKind,
        action: ChangeAction,
    ) -> Result<Outcome, JournalError> {
        let Some(existing) = self.store.get(id, kind)? else {
            self.store.insert(&PendingChange::new(id, kind, action))?;
            return Ok(Outcome::Recorded(action));
        };

        if unexpected_pairing(existing.action, action) {
            tracing::debug!(
                id,
                kind = %kind,
                existing = %existing.action,
                incoming = %action,
                "unexpected change pairing, keeping existing record"
            );
        }

        match merge(existing.action, action) {
            MergeAction::Keep => Ok(Outcome::Unchanged),
            MergeAction::Drop => {
                self.store.delete(id, kind)?;
                Ok(Outcome::Collapsed)
            }
            MergeAction::Replace(net) => {
                self.store.delete(id, kind)?;
                self.store
                    .insert(&PendingChange::new(id, kind, net))
                    .map_err(|source| JournalError::ReplaceInterrupted {
                        id,
                        kind,
                        action: net,
                        source,
                    })?;
                Ok(Outcome::Rewritten(net))
            }
        }
    }

    /// Drain every queued event from the feed, in arrival order.
    ///
    /// Store failures are counted and logged per event; one bad event never
    /// stops the drain or corrupts unrelated keys.
    pub fn pump(&mut self, feed: &ChangeFeed) -> DrainStats {
        let mut stats = DrainStats::default();
        for event in feed.drain() {
            match self.observe(&event) {
                Ok(Outcome::Ignored) => stats.ignored += 1,
                Ok(_) => stats.reconciled += 1,
                Err(error) => {
                    stats.errors += 1;
                    tracing::warn!(%error, "failed to reconcile model event");
                }
            }
        }
        stats
    }

    /// Unordered snapshot of every record awaiting synchronization.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn pending(&self) -> Result<Vec<PendingChange>, JournalError> {
        Ok(self.store.all()?)
    }

    /// Drop one record after a downstream consumer has replayed it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn acknowledge(&mut self, id: i64, kind: EntityKind) -> Result<(), JournalError> {
        Ok(self.store.delete(id, kind)?)
    }

    /// Drop every record after a full sync has been acknowledged.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn acknowledge_all(&mut self) -> Result<(), JournalError> {
        Ok(self.store.clear()?)
    }

    /// Human-readable one-liner for status surfaces.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn summary(&self) -> Result<String, JournalError> {
        let count = self.store.all()?.len();
        Ok(format!("pending changes: {count}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::EntityRef;
    use crate::store::MemoryStore;

    /// Store double that fails the next insert with a synthetic error.
    struct FlakyStore {
        inner: MemoryStore,
        fail_next_insert: bool,
    }

    impl JournalStore for FlakyStore {
        fn get(&self, id: i64, kind: EntityKind) -> Result<Option<PendingChange>, StoreError> {
            self.inner.get(id, kind)
        }

        fn insert(&mut self, change: &PendingChange) -> Result<(), StoreError> {
            if self.fail_next_insert {
                self.fail_next_insert = false;
                return Err(StoreError::Database(rusqlite::Error::InvalidQuery));
            }
            self.inner.insert(change)
        }

        fn delete(&mut self, id: i64, kind: EntityKind) -> Result<(), StoreError> {
            self.inner.delete(id, kind)
        }

        fn all(&self) -> Result<Vec<PendingChange>, StoreError> {
            self.inner.all()
        }

        fn clear(&mut self) -> Result<(), StoreError> {
            self.inner.clear()
        }
    }

    #[test]
    fn merge_table_matches_the_rule_set() {
        use ChangeAction::{Add, Change, Delete};

        assert_eq!(merge(Add, Delete), MergeAction::Drop);
        assert_eq!(merge(Change, Delete), MergeAction::Replace(Delete));
        assert_eq!(merge(Delete, Add), MergeAction::Replace(Change));

        // Every other pairing is a deliberate no-op.
        for existing in ChangeAction::ALL {
            for incoming in ChangeAction::ALL {
                if matches!(
                    (existing, incoming),
                    (Add, Delete) | (Change, Delete) | (Delete, Add)
                ) {
                    continue;
                }
                assert_eq!(merge(existing, incoming), MergeAction::Keep);
            }
        }
    }

    #[test]
    fn anomalous_pairings_are_flagged_but_listed_ones_are_not() {
        use ChangeAction::{Add, Change, Delete};

        assert!(unexpected_pairing(Add, Add));
        assert!(unexpected_pairing(Change, Add));
        assert!(unexpected_pairing(Delete, Delete));
        assert!(unexpected_pairing(Delete, Change));

        assert!(!unexpected_pairing(Add, Delete));
        assert!(!unexpected_pairing(Change, Delete));
        assert!(!unexpected_pairing(Delete, Add));
        assert!(!unexpected_pairing(Add, Change));
        assert!(!unexpected_pairing(Change, Change));
    }

    #[test]
    fn first_event_for_a_key_inserts_it() {
        let mut journal = Journal::new(MemoryStore::new());

        for (id, action) in [
            (1, ChangeAction::Add),
            (2, ChangeAction::Change),
            (3, ChangeAction::Delete),
        ] {
            let outcome = journal
                .record(id, EntityKind::Task, action)
                .expect("record first event");
            assert_eq!(outcome, Outcome::Recorded(action));
        }
        assert_eq!(journal.pending().expect("snapshot").len(), 3);
    }

    #[test]
    fn untracked_kind_is_ignored_without_a_write() {
        let store = MemoryStore::new();
        let mut journal = Journal::tracking(store, &[EntityKind::Appointment]);

        let outcome = journal
            .observe(&ModelEvent::new(EntityRef::Task(7), ChangeAction::Add))
            .expect("observe untracked kind");
        assert_eq!(outcome, Outcome::Ignored);
        assert!(journal.pending().expect("snapshot").is_empty());
    }

    #[test]
    fn interrupted_replace_leaves_the_key_empty() {
        let mut journal = Journal::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_next_insert: false,
        });

        journal
            .record(4, EntityKind::Project, ChangeAction::Change)
            .expect("seed change record");

        journal.store.fail_next_insert = true;
        let err = journal
            .record(4, EntityKind::Project, ChangeAction::Delete)
            .expect_err("replace insert half fails");

        match err {
            JournalError::ReplaceInterrupted { id, kind, action, .. } => {
                assert_eq!(id, 4);
                assert_eq!(kind, EntityKind::Project);
                assert_eq!(action, ChangeAction::Delete);
            }
            other => panic!("expected ReplaceInterrupted, got {other:?}"),
        }

        // Under-reporting, never a stale record.
        assert!(
            journal
                .store
                .get(4, EntityKind::Project)
                .expect("get after interrupted replace")
                .is_none()
        );

        // The journal stays usable afterwards.
        let outcome = journal
            .record(5, EntityKind::Project, ChangeAction::Add)
            .expect("journal still usable");
        assert_eq!(outcome, Outcome::Recorded(ChangeAction::Add));
    }

    #[test]
    fn summary_reports_the_pending_count() {
        let mut journal = Journal::new(MemoryStore::new());
        assert_eq!(journal.summary().expect("summary"), "pending changes: 0");

        journal
            .record(1, EntityKind::Appointment, ChangeAction::Add)
            .expect("record event");
        assert_eq!(journal.summary().expect("summary"), "pending changes: 1");
    }
}
