//! Persistence adapter for the durable key-value store.
//!
//! The whole project (script, groups, render config, chat transcript, and
//! snapshot history) is serialized as one camelCase JSON bundle under a
//! fixed key. Loading runs structural schema migration; saving distinguishes
//! quota exhaustion from other backend failures because embedded image
//! payloads make quota errors an everyday event, not an anomaly.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::history::ProjectSnapshot;
use crate::persist::input::StoredBundle;
use crate::project::model::{AspectRatio, ChatMessage, Resolution, SceneGroup};
use crate::project::store::ProjectStore;

pub mod input;
pub mod migrate;

/// The single key used in the durable store.
pub const STORAGE_KEY: &str = "STORYBOARD_AI_DATA";

// =============================================================================
// KEY-VALUE STORE BOUNDARY
// =============================================================================

/// Errors surfaced by a key-value store backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The value does not fit in the remaining quota.
    #[error("storage quota exceeded")]
    QuotaExceeded,

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A durable string-keyed blob store (browser localStorage or equivalent).
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory reference implementation, with an optional byte capacity so
/// tests can exercise quota behavior.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    capacity: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits stored values to `bytes` in total.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: Some(bytes),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(capacity) = self.capacity {
            let other_bytes: usize = self
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            if other_bytes + value.len() > capacity {
                return Err(StoreError::QuotaExceeded);
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// ADAPTER
// =============================================================================

/// Errors surfaced to the user by the persistence adapter. Quota exhaustion
/// gets its own variant (and message) per the error taxonomy.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Storage quota exceeded. The project is too large to save; try removing generated images.")]
    QuotaExceeded,

    #[error("Failed to save project: {0}")]
    Storage(String),

    #[error("Failed to load project: {0}")]
    Corrupt(String),
}

/// Outcome of a load attempt. An absent key is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing has ever been saved under the storage key.
    NothingSaved,
    /// The stored bundle was migrated and installed into the store.
    Restored,
}

/// Serialized form of the project bundle. Field names match the shape the
/// browser app has always written.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedBundle<'a> {
    script: &'a str,
    scene_groups: &'a [SceneGroup],
    aspect_ratio: AspectRatio,
    resolution: Resolution,
    chat_history: &'a [ChatMessage],
    project_history: &'a [ProjectSnapshot],
}

/// Serializes the whole project (state + history) to the stored JSON shape.
pub fn encode_bundle(project: &ProjectStore) -> Result<String, PersistError> {
    let state = project.state();
    let bundle = SavedBundle {
        script: &state.script_text,
        scene_groups: &state.scene_groups,
        aspect_ratio: state.aspect_ratio,
        resolution: state.resolution,
        chat_history: &state.chat_messages,
        project_history: project.history(),
    };
    serde_json::to_string(&bundle).map_err(|e| PersistError::Storage(e.to_string()))
}

/// Parses and migrates a stored JSON bundle.
pub fn decode_bundle(json: &str) -> Result<migrate::RestoredProject, PersistError> {
    let bundle: StoredBundle =
        serde_json::from_str(json).map_err(|e| PersistError::Corrupt(e.to_string()))?;
    Ok(migrate::restore_bundle(bundle))
}

/// Serializes and restores the full state bundle against a [`KeyValueStore`].
pub struct PersistenceAdapter<S: KeyValueStore> {
    backend: S,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// Access to the underlying backend.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Serializes the whole project under [`STORAGE_KEY`].
    pub fn save(&mut self, project: &ProjectStore) -> Result<(), PersistError> {
        let json = encode_bundle(project)?;

        match self.backend.save(STORAGE_KEY, &json) {
            Ok(()) => {
                log::debug!("saved project bundle ({} bytes)", json.len());
                Ok(())
            }
            Err(StoreError::QuotaExceeded) => Err(PersistError::QuotaExceeded),
            Err(StoreError::Backend(msg)) => Err(PersistError::Storage(msg)),
        }
    }

    /// Loads, migrates, and installs the stored bundle. On any failure the
    /// in-memory state is left untouched.
    pub fn load(&self, project: &mut ProjectStore) -> Result<LoadOutcome, PersistError> {
        let json = match self.backend.load(STORAGE_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return Ok(LoadOutcome::NothingSaved),
            Err(e) => return Err(PersistError::Storage(e.to_string())),
        };

        let restored = decode_bundle(&json)?;

        project.replace_history(restored.history);
        project.replace_state(restored.state);
        Ok(LoadOutcome::Restored)
    }
}

// =============================================================================
// TESTS
// =============================================================================
