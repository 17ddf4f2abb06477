//! Wizard session snapshots and their on-disk format.
//!
//! A snapshot captures the whole session — flow table, position, terminal
//! flag and step contexts — so a restored process resumes exactly where it
//! left off.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::registry::StepRecord;
use crate::step::{StepContext, StepType};

/// Persisted wizard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSnapshot {
    /// Snapshot format version (for future migrations).
    pub version: u32,

    /// Ordered flow table, preserving completion flags.
    pub steps: Vec<StepRecord>,

    /// Active position, if the wizard was started.
    pub position: Option<usize>,

    /// Whether the wizard already reached its terminal state.
    #[serde(default)]
    pub finished: bool,

    /// Persisted step contexts, keyed by step type.
    #[serde(default)]
    pub contexts: BTreeMap<StepType, StepContext>,
}

impl WizardSnapshot {
    /// Current snapshot format version.
    pub const VERSION: u32 = 1;

    pub fn new(
        steps: Vec<StepRecord>,
        position: Option<usize>,
        finished: bool,
        contexts: BTreeMap<StepType, StepContext>,
    ) -> Self {
        Self {
            version: Self::VERSION,
            steps,
            position,
            finished,
            contexts,
        }
    }
}

/// JSON file round-trip for wizard snapshots.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot file under the platform config directory for `app_name`.
    pub fn default_for(app_name: &str) -> Result<Self, PersistenceError> {
        let dir = dirs::config_dir().ok_or(PersistenceError::NoConfigDir)?;
        Ok(Self::new(dir.join(app_name).join("wizard.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save a snapshot, creating parent directories as needed.
    pub fn save(&self, snapshot: &WizardSnapshot) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| {
                PersistenceError::DirectoryCreationFailed {
                    path: parent.display().to_string(),
                    source,
                }
            })?;
        }

        let json = serde_json::to_string_pretty(snapshot).map_err(|source| {
            PersistenceError::SaveFailed {
                path: self.path.display().to_string(),
                source: Box::new(source),
            }
        })?;
        fs::write(&self.path, json).map_err(|source| PersistenceError::SaveFailed {
            path: self.path.display().to_string(),
            source: Box::new(source),
        })?;

        tracing::debug!(path = %self.path.display(), "saved wizard snapshot");
        Ok(())
    }

    /// Load a snapshot. Returns `Ok(None)` when no file exists yet.
    pub fn load(&self) -> Result<Option<WizardSnapshot>, PersistenceError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no wizard snapshot found");
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path).map_err(|source| {
            PersistenceError::LoadFailed {
                path: self.path.display().to_string(),
                source: Box::new(source),
            }
        })?;
        let snapshot: WizardSnapshot = serde_json::from_str(&json).map_err(|source| {
            PersistenceError::LoadFailed {
                path: self.path.display().to_string(),
                source: Box::new(source),
            }
        })?;

        if snapshot.version != WizardSnapshot::VERSION {
            tracing::warn!(
                expected = WizardSnapshot::VERSION,
                found = snapshot.version,
                "wizard snapshot version mismatch"
            );
        }

        tracing::debug!(path = %self.path.display(), "loaded wizard snapshot");
        Ok(Some(snapshot))
    }

    /// Delete the snapshot file if present.
    pub fn delete(&self) -> Result<(), PersistenceError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|source| PersistenceError::DeleteFailed {
                path: self.path.display().to_string(),
                source,
            })?;
            tracing::debug!(path = %self.path.display(), "deleted wizard snapshot");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FlowRegistry;

    fn sample_snapshot() -> WizardSnapshot {
        let mut registry = FlowRegistry::new();
        registry.add_step("account", true);
        registry.add_step("profile", false);
        registry.add_step("confirm", true);
        registry.set_completed(0, true).unwrap();

        let mut context = StepContext::new();
        context.set("email", "ada@example.com").unwrap();
        let mut contexts = BTreeMap::new();
        contexts.insert(StepType::new("account"), context);

        WizardSnapshot::new(registry.to_records(), Some(1), false, contexts)
    }

    #[test]
    fn test_snapshot_serialization_preserves_order_and_flags() {
        let snapshot = sample_snapshot();

        let json = serde_json::to_string(&snapshot).unwrap();
        let deserialized: WizardSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot, deserialized);
        assert_eq!(deserialized.steps[0].step_type.as_str(), "account");
        assert!(deserialized.steps[0].completed);
        assert_eq!(deserialized.steps[1].step_type.as_str(), "profile");
        assert_eq!(deserialized.position, Some(1));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested").join("wizard.json"));

        let snapshot = sample_snapshot();
        file.save(&snapshot).unwrap();

        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("wizard.json"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("wizard.json"));

        file.save(&sample_snapshot()).unwrap();
        file.delete().unwrap();
        assert!(file.load().unwrap().is_none());
        // Deleting again is fine.
        file.delete().unwrap();
    }
}
