//! Vocabulary types for the pending-change journal.
//!
//! String representation uses lowercase tokens (`"appointment"`, `"add"`,
//! ...) both in the SQLite journal table and in exported snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four entity kinds tracked for synchronization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Appointment,
    Task,
    Subtask,
    Project,
}

/// Error returned when parsing an unknown entity-kind token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEntityKind {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownEntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown entity kind '{}': expected one of appointment, task, subtask, project",
            self.raw
        )
    }
}

impl std::error::Error for UnknownEntityKind {}

impl EntityKind {
    /// All tracked kinds, in declaration order.
    pub const ALL: [Self; 4] = [Self::Appointment, Self::Task, Self::Subtask, Self::Project];

    /// Return the canonical lowercase token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Appointment => "appointment",
            Self::Task => "task",
            Self::Subtask => "subtask",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "appointment" => Ok(Self::Appointment),
            "task" => Ok(Self::Task),
            "subtask" => Ok(Self::Subtask),
            "project" => Ok(Self::Project),
            _ => Err(UnknownEntityKind { raw: s.to_string() }),
        }
    }
}

/// The nature of a mutation to a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// The entity was created since the last sync.
    Add,
    /// The entity's content changed.
    Change,
    /// The entity was removed.
    Delete,
}

/// Error returned when parsing an unknown change-action token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChangeAction {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown change action '{}': expected one of add, change, delete",
            self.raw
        )
    }
}

impl std::error::Error for UnknownChangeAction {}

impl ChangeAction {
    /// All actions, in declaration order.
    pub const ALL: [Self; 3] = [Self::Add, Self::Change, Self::Delete];

    /// Return the canonical lowercase token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = UnknownChangeAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "change" => Ok(Self::Change),
            "delete" => Ok(Self::Delete),
            _ => Err(UnknownChangeAction { raw: s.to_string() }),
        }
    }
}

/// One persisted net-change record awaiting synchronization.
///
/// The journal holds at most one `PendingChange` per `(id, kind)` pair; the
/// store's primary key is that pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    /// Entity identifier, unique within its kind.
    pub id: i64,
    /// Which of the four tracked kinds the entity is.
    pub kind: EntityKind,
    /// The net mutation the remote replica has not seen yet.
    pub action: ChangeAction,
}

impl PendingChange {
    /// Build a record for the given key and action.
    #[must_use]
    pub const fn new(id: i64, kind: EntityKind, action: ChangeAction) -> Self {
        Self { id, kind, action }
    }
}

impl fmt::Display for PendingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.action, self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tokens_round_trip() {
        for kind in EntityKind::ALL {
            let parsed: EntityKind = kind.as_str().parse().expect("token parses back");
            assert_eq!(parsed, kind);
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }

    #[test]
    fn action_tokens_round_trip() {
        for action in ChangeAction::ALL {
            let parsed: ChangeAction = action.as_str().parse().expect("token parses back");
            assert_eq!(parsed, action);
            assert_eq!(action.to_string(), action.as_str());
        }
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        let err = "memo".parse::<EntityKind>().expect_err("memo is untracked");
        assert_eq!(err.raw, "memo");

        let err = "upsert"
            .parse::<ChangeAction>()
            .expect_err("upsert is not an action");
        assert_eq!(err.raw, "upsert");
    }

    #[test]
    fn serde_uses_lowercase_tokens() {
        let record = PendingChange::new(5, EntityKind::Appointment, ChangeAction::Add);
        let json = serde_json::to_string(&record).expect("serialize record");
        assert_eq!(json, r#"{"id":5,"kind":"appointment","action":"add"}"#);

        let back: PendingChange = serde_json::from_str(&json).expect("deserialize record");
        assert_eq!(back, record);
    }

    #[test]
    fn display_reads_action_kind_id() {
        let record = PendingChange::new(12, EntityKind::Subtask, ChangeAction::Delete);
        assert_eq!(record.to_string(), "delete subtask 12");
    }
}
