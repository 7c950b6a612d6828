//! Input structs for parsing stored project JSON.
//!
//! The durable store has no schema version field, so these structs accept
//! every layout that has ever been written: the current grouped shape, the
//! legacy flat-`scenes` shape, and anything in between with fields missing.
//! Every field is defaulted and ids are optional; `migrate` turns this into
//! live model types.

use serde::Deserialize;

/// Root of the stored bundle under the fixed storage key.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredBundle {
    pub script: String,
    /// Current grouped layout.
    pub scene_groups: Option<Vec<StoredGroup>>,
    /// Legacy flat layout, present only in old saves.
    pub scenes: Option<Vec<StoredScene>>,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
    pub chat_history: Vec<StoredChatMessage>,
    pub project_history: Vec<StoredSnapshot>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredGroup {
    pub id: Option<String>,
    pub name: Option<String>,
    pub is_collapsed: bool,
    pub scenes: Vec<StoredScene>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredScene {
    pub id: Option<String>,
    pub scene_number: i32,
    pub description: String,
    pub visual_prompt: String,
    pub image_url: Option<String>,
    pub notes: String,
    pub prompt_history: Vec<StoredPromptVersion>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredPromptVersion {
    pub prompt: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredChatMessage {
    pub role: String,
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredSnapshot {
    pub id: Option<String>,
    pub name: String,
    pub timestamp: i64,
    pub data: StoredSnapshotData,
}

/// Snapshot payload. Old snapshots stored the script under `script` and a
/// flat `scenes` list; current ones use `scriptText` and `sceneGroups`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredSnapshotData {
    pub script_text: Option<String>,
    pub script: Option<String>,
    pub scene_groups: Option<Vec<StoredGroup>>,
    pub scenes: Option<Vec<StoredScene>>,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
}
