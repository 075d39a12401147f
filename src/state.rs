//! Cache state persistence
//!
//! Records the last checkpoint image of each cached stage so the next
//! invocation can skip it. A missing or unreadable record is empty.

use crate::error::{ContainmeError, ContainmeResult};
use crate::spec::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// File name of the state record inside the state directory
pub const STATE_FILE: &str = "state";

/// Stage name → last successful checkpoint image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildState {
    pub checkpoints: BTreeMap<String, String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BuildState {
    /// Checkpoint image recorded for a stage
    pub fn checkpoint(&self, stage: Stage) -> Option<&str> {
        self.checkpoints
            .get(stage.as_str())
            .map(String::as_str)
            .filter(|image| !image.is_empty())
    }

    /// Record a stage's checkpoint image
    pub fn set_checkpoint(&mut self, stage: Stage, image: impl Into<String>) {
        self.checkpoints.insert(stage.as_str().to_string(), image.into());
        self.updated_at = Some(Utc::now());
    }
}

/// Reads and writes the state record under a build's state directory
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store rooted at `<state_dir>/state`
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(STATE_FILE),
        }
    }

    /// Path of the state record
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, treating a missing or corrupt file as empty
    pub async fn load(&self) -> BuildState {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                debug!("No cache state at {}: {}", self.path.display(), e);
                return BuildState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring unreadable cache state {}: {}", self.path.display(), e);
                BuildState::default()
            }
        }
    }

    /// Persist the record
    pub async fn save(&self, state: &BuildState) -> ContainmeResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ContainmeError::io("creating state directory", e))?;
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content).await.map_err(|e| {
            ContainmeError::io(format!("writing cache state {}", self.path.display()), e)
        })?;

        debug!("Saved cache state to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(&temp.path().join(".containme"));
        assert_eq!(store.load().await, BuildState::default());
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(&temp.path().join(".containme"));

        let mut state = BuildState::default();
        state.set_checkpoint(Stage::Environment, "sha256:env");
        state.set_checkpoint(Stage::Dependencies, "sha256:deps");
        store.save(&state).await.unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.checkpoint(Stage::Environment), Some("sha256:env"));
        assert_eq!(loaded.checkpoint(Stage::Dependencies), Some("sha256:deps"));
        assert_eq!(loaded.checkpoint(Stage::Test), None);
        assert!(loaded.updated_at.is_some());
    }

    #[tokio::test]
    async fn corrupt_record_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());
        fs::write(store.path(), "{not json").await.unwrap();
        assert_eq!(store.load().await, BuildState::default());
    }

    #[test]
    fn empty_checkpoint_is_absent() {
        let mut state = BuildState::default();
        state.set_checkpoint(Stage::Environment, "");
        assert_eq!(state.checkpoint(Stage::Environment), None);
    }
}
