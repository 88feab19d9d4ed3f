//! Mutation notifications from the domain models.
//!
//! Models announce every create/change/delete as a [`ModelEvent`]. The event
//! carries a tagged [`EntityRef`]; the producing model decides the kind at
//! construction time, so the journal never inspects an opaque object. Events
//! with a missing entity or action are unrelated model traffic and normalize
//! to nothing.
//!
//! [`change_feed`] gives producers a cloneable [`ChangeSender`] and the
//! journal owner a [`ChangeFeed`] to drain. One receiver draining one event
//! at a time is what keeps same-key reconciliations from interleaving.

use std::sync::mpsc;

use crate::model::{ChangeAction, EntityKind};

/// Reference to one tracked entity, tagged with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Appointment(i64),
    Task(i64),
    Subtask(i64),
    Project(i64),
}

impl EntityRef {
    /// The entity's identifier within its kind.
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Appointment(id) | Self::Task(id) | Self::Subtask(id) | Self::Project(id) => id,
        }
    }

    /// Which of the four tracked kinds this reference names.
    #[must_use]
    pub const fn kind(self) -> EntityKind {
        match self {
            Self::Appointment(_) => EntityKind::Appointment,
            Self::Task(_) => EntityKind::Task,
            Self::Subtask(_) => EntityKind::Subtask,
            Self::Project(_) => EntityKind::Project,
        }
    }
}

/// One transient mutation notification.
///
/// Either field may be absent; such events are ignorable traffic, not
/// errors. The event is discarded after producing at most one journal write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelEvent {
    /// The mutated entity, when the producer had one to report.
    pub entity: Option<EntityRef>,
    /// What happened to it.
    pub action: Option<ChangeAction>,
}

impl ModelEvent {
    /// Build a fully-populated event.
    #[must_use]
    pub const fn new(entity: EntityRef, action: ChangeAction) -> Self {
        Self {
            entity: Some(entity),
            action: Some(action),
        }
    }

    /// Reduce to the `(id, kind, action)` triple the journal reconciles,
    /// or `None` when the event carries nothing reconcilable.
    #[must_use]
    pub fn normalize(&self) -> Option<(i64, EntityKind, ChangeAction)> {
        let entity = self.entity?;
        let action = self.action?;
        Some((entity.id(), entity.kind(), action))
    }
}

/// Producer half of the change feed. Clone one per domain model.
#[derive(Debug, Clone)]
pub struct ChangeSender {
    tx: mpsc::Sender<ModelEvent>,
}

impl ChangeSender {
    /// Queue a model event for reconciliation.
    ///
    /// Delivery is best-effort: when the receiving end has been dropped the
    /// event is discarded.
    pub fn send(&self, event: ModelEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("change feed closed, dropping model event");
        }
    }
}

/// Consumer half of the change feed, drained by the journal owner.
#[derive(Debug)]
pub struct ChangeFeed {
    rx: mpsc::Receiver<ModelEvent>,
}

impl ChangeFeed {
    /// Pull every event queued so far, in arrival order, without blocking.
    pub fn drain(&self) -> impl Iterator<Item = ModelEvent> + '_ {
        self.rx.try_iter()
    }
}

/// Create a connected sender/feed pair.
#[must_use]
pub fn change_feed() -> (ChangeSender, ChangeFeed) {
    let (tx, rx) = mpsc::channel();
    (ChangeSender { tx }, ChangeFeed { rx })
}
