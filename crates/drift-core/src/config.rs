//! Journal configuration.
//!
//! Loaded from a TOML file by the composition root. A missing file means
//! defaults: the journal database under `drift/` and all four entity kinds
//! tracked.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::EntityKind;

/// Settings for one journal instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Where the SQLite journal database lives.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Which entity kinds get journaled; events for other kinds are ignored.
    #[serde(default = "default_tracked")]
    pub tracked: Vec<EntityKind>,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            tracked: default_tracked(),
        }
    }
}

impl JournalConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        toml::from_str::<Self>(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("drift/journal.sqlite3")
}

fn default_tracked() -> Vec<EntityKind> {
    EntityKind::ALL.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_track_all_kinds() {
        let config = JournalConfig::default();
        assert_eq!(config.db_path, PathBuf::from("drift/journal.sqlite3"));
        assert_eq!(config.tracked, EntityKind::ALL.to_vec());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config =
            JournalConfig::load(&dir.path().join("no-such-config.toml")).expect("load defaults");
        assert_eq!(config.tracked.len(), 4);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tracked = [\"appointment\", \"task\"]\n")
            .expect("write config file");

        let config = JournalConfig::load(&path).expect("load config");
        assert_eq!(
            config.tracked,
            vec![EntityKind::Appointment, EntityKind::Task]
        );
        assert_eq!(config.db_path, PathBuf::from("drift/journal.sqlite3"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tracked = [\"memo\"]\n").expect("write config file");

        assert!(JournalConfig::load(&path).is_err());
    }
}
