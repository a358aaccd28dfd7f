//! Best-effort snapshot persistence for the demo store.
//!
//! The snapshot is one JSON object written wholesale under [`STORAGE_KEY`].
//! Writes never fail loudly and loads default each field independently, so a
//! stale or corrupt snapshot degrades to defaults instead of an error.

use crate::agent_activity::AgentActivity;
use crate::brain::BrainDocument;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Session storage key for the demo snapshot.
pub const STORAGE_KEY: &str = "contentq-demo-state";

/// Errors a storage backend can report. Callers in this crate log and continue.
#[derive(Debug)]
pub enum StorageError {
    /// The backend refused the write because it would exceed its quota.
    QuotaExceeded { key: String, bytes: usize, quota: usize },
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded { key, bytes, quota } => write!(
                f,
                "quota exceeded writing '{}': {} bytes over a {} byte quota",
                key, bytes, quota
            ),
            Self::Io(e) => write!(f, "storage i/o error: {}", e),
            Self::Serialization(e) => write!(f, "serialization error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::QuotaExceeded { .. } => None,
            Self::Io(e) => Some(e),
            Self::Serialization(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

/// Session-scoped string key/value storage.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// One file per key under a session directory.
pub struct FileSessionStorage {
    dir: PathBuf,
}

impl FileSessionStorage {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create session directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SessionStorage for FileSessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, value)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage. Clones share the same map, so a test can keep a handle
/// while the store owns another.
#[derive(Clone, Default)]
pub struct MemorySessionStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects any single value larger than `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: Arc::default(),
            quota: Some(quota),
        }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            if value.len() > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    bytes: value.len(),
                    quota,
                });
            }
        }
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// A workflow the user has started and not finished.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowProgressEntry {
    pub workflow_id: String,
    pub workflow_type: String,
    pub current_stage_index: usize,
    pub total_stages: usize,
    pub current_stage_title: String,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowProgressEntry {
    /// True once the workflow sits on its last stage, or has no stages at all.
    pub fn reached_final_stage(&self) -> bool {
        self.current_stage_index + 1 >= self.total_stages
    }
}

/// The persisted subset of demo state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DemoSnapshot {
    pub active_agents: Vec<AgentActivity>,
    pub agent_history: Vec<AgentActivity>,
    pub brain_documents: Vec<BrainDocument>,
    pub active_brain_documents: Vec<String>,
    pub workflows_in_progress: Vec<WorkflowProgressEntry>,
    pub show_agent_details: bool,
    pub simulation_speed: f64,
}

impl Default for DemoSnapshot {
    fn default() -> Self {
        Self {
            active_agents: Vec::new(),
            agent_history: Vec::new(),
            brain_documents: Vec::new(),
            active_brain_documents: Vec::new(),
            workflows_in_progress: Vec::new(),
            show_agent_details: true,
            simulation_speed: 1.0,
        }
    }
}

/// Serializes and writes the snapshot. Failures are logged, never returned.
pub fn save_to_storage(storage: &dyn SessionStorage, snapshot: &DemoSnapshot) {
    let content = match serde_json::to_string(snapshot) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize demo state");
            return;
        }
    };
    if let Err(e) = storage.set_item(STORAGE_KEY, &content) {
        tracing::warn!(error = %e, "Failed to save demo state");
    }
}

/// Reads the snapshot, defaulting each field that is absent or malformed.
pub fn load_from_storage(storage: &dyn SessionStorage) -> DemoSnapshot {
    let content = match storage.get_item(STORAGE_KEY) {
        Ok(Some(content)) => content,
        Ok(None) => return DemoSnapshot::default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read demo state");
            return DemoSnapshot::default();
        }
    };
    snapshot_from_str(&content)
}

fn snapshot_from_str(content: &str) -> DemoSnapshot {
    let fields = match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => {
            tracing::warn!("Demo state is not a JSON object, using defaults");
            return DemoSnapshot::default();
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse demo state, using defaults");
            return DemoSnapshot::default();
        }
    };

    let defaults = DemoSnapshot::default();
    DemoSnapshot {
        active_agents: field_or(&fields, "activeAgents", defaults.active_agents),
        agent_history: field_or(&fields, "agentHistory", defaults.agent_history),
        brain_documents: field_or(&fields, "brainDocuments", defaults.brain_documents),
        active_brain_documents: field_or(
            &fields,
            "activeBrainDocuments",
            defaults.active_brain_documents,
        ),
        workflows_in_progress: field_or(
            &fields,
            "workflowsInProgress",
            defaults.workflows_in_progress,
        ),
        show_agent_details: field_or(&fields, "showAgentDetails", defaults.show_agent_details),
        simulation_speed: field_or(&fields, "simulationSpeed", defaults.simulation_speed),
    }
}

fn field_or<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str, default: T) -> T {
    let Some(value) = fields.get(key) else {
        return default;
    };
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(field = key, error = %e, "Ignoring malformed demo state field");
            default
        }
    }
}

#[cfg(test)]
#[path = "tests/persistence_tests.rs"]
mod tests;
