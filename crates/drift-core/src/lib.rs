//! drift-core: a pending-change journal for offline-first sync.
//!
//! Domain models announce every create/change/delete of a tracked entity
//! (appointments, tasks, subtasks, projects). The [`Journal`] folds that
//! stream into at most one net-change record per entity, so a downstream
//! sync pass replays only the minimal operation set: create-then-delete
//! never leaves the machine, and change-then-delete replays as a single
//! delete.
//!
//! # Conventions
//!
//! - **Errors**: thiserror enums at module seams, `anyhow::Result` in
//!   open/load paths.
//! - **Logging**: `tracing` macros (`warn!`, `debug!`).

pub mod config;
pub mod export;
pub mod journal;
pub mod model;
pub mod notify;
pub mod store;

pub use config::JournalConfig;
pub use export::{Snapshot, SnapshotError};
pub use journal::{DrainStats, Journal, JournalError, Outcome};
pub use model::{ChangeAction, EntityKind, PendingChange};
pub use notify::{ChangeFeed, ChangeSender, EntityRef, ModelEvent, change_feed};
pub use store::{JournalStore, MemoryStore, SqliteStore, StoreError};
