//! Project snapshot history: save, branch, and restore whole project states.
//!
//! Snapshots are deep, fully independent copies of the project value. The
//! list is newest-first; entries are immutable once created and only ever
//! prepended or deleted by id.

use serde::{Deserialize, Serialize};

use crate::error::{BoardError, BoardResult};
use crate::persist::migrate::normalize_groups_in_place;
use crate::project::model::{new_id, AspectRatio, ProjectState, Resolution, SceneGroup};
use crate::project::store::ProjectStore;

/// Name given to the automatic snapshot taken before a destructive
/// re-analysis.
pub const AUTO_SNAPSHOT_NAME: &str = "Auto-save: Before Analysis";

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

// =============================================================================
// SNAPSHOT TYPES
// =============================================================================

/// The captured portion of the project: script, grouped scenes, and render
/// configuration. Chat transcript and history itself are not captured.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotData {
    pub script_text: String,
    pub scene_groups: Vec<SceneGroup>,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
}

impl SnapshotData {
    /// Captures a deep copy of the relevant fields of a project state.
    pub fn capture(state: &ProjectState) -> Self {
        Self {
            script_text: state.script_text.clone(),
            scene_groups: state.scene_groups.clone(),
            aspect_ratio: state.aspect_ratio,
            resolution: state.resolution,
        }
    }
}

/// An immutable, timestamped, restorable copy of the whole project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSnapshot {
    pub id: String,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub data: SnapshotData,
}

// =============================================================================
// HISTORY OPERATIONS
// =============================================================================

impl ProjectStore {
    /// Captures a snapshot of the current project and prepends it to the
    /// history (newest first). A missing name defaults to one derived from
    /// the scene count. Returns a copy of the stored snapshot.
    pub fn create_snapshot(&mut self, name: Option<&str>) -> ProjectSnapshot {
        let default_name = format!("Snapshot ({} scenes)", self.state.scene_count());
        let snapshot = ProjectSnapshot {
            id: new_id(),
            name: name.unwrap_or(&default_name).to_string(),
            timestamp: now_millis(),
            data: SnapshotData::capture(&self.state),
        };
        self.history.insert(0, snapshot.clone());
        self.notify();
        snapshot
    }

    /// Silently captures the recovery snapshot taken before a destructive
    /// re-analysis.
    pub fn create_auto_snapshot(&mut self) -> ProjectSnapshot {
        self.create_snapshot(Some(AUTO_SNAPSHOT_NAME))
    }

    /// Replaces the live script, scene groups, and render configuration with
    /// deep copies from a snapshot. Irreversible overwrite, so it is gated
    /// on explicit confirmation. The snapshot data goes through the same
    /// normalization as a project load; persisted snapshots are never
    /// trusted to match the current schema.
    pub fn restore_snapshot(&mut self, snapshot_id: &str, confirmed: bool) -> BoardResult<()> {
        if !confirmed {
            return Err(BoardError::confirmation_required("restoring a snapshot"));
        }
        let snapshot = self
            .history
            .iter()
            .find(|s| s.id == snapshot_id)
            .cloned()
            .ok_or_else(|| BoardError::snapshot_not_found(snapshot_id))?;

        let mut data = snapshot.data;
        normalize_groups_in_place(&mut data.scene_groups);

        self.update(|state| {
            state.script_text = data.script_text.clone();
            state.scene_groups = data.scene_groups.clone();
            state.aspect_ratio = data.aspect_ratio;
            state.resolution = data.resolution;
        });
        Ok(())
    }

    /// Deletes a snapshot by id. Does not touch the live state. Gated on
    /// explicit confirmation.
    pub fn delete_snapshot(&mut self, snapshot_id: &str, confirmed: bool) -> BoardResult<()> {
        if !confirmed {
            return Err(BoardError::confirmation_required("deleting a snapshot"));
        }
        let before = self.history.len();
        self.history.retain(|s| s.id != snapshot_id);
        if self.history.len() == before {
            return Err(BoardError::snapshot_not_found(snapshot_id));
        }
        self.notify();
        Ok(())
    }

    /// Replaces the whole history list (used by the persistence adapter).
    pub fn replace_history(&mut self, history: Vec<ProjectSnapshot>) {
        self.history = history;
        self.notify();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::model::{Scene, SceneActivity};

    fn store_with_scenes(n: i32) -> ProjectStore {
        let scenes = (1..=n).map(Scene::new).collect();
        let state = ProjectState {
            script_text: "INT. OFFICE - DAY".to_string(),
            scene_groups: vec![SceneGroup::new("Sequence 01").with_scenes(scenes)],
            ..Default::default()
        };
        ProjectStore::with_state(state)
    }

    #[test]
    fn test_create_snapshot_prepends_newest_first() {
        let mut store = store_with_scenes(2);
        let first = store.create_snapshot(Some("one"));
        let second = store.create_snapshot(Some("two"));

        assert_eq!(store.history().len(), 2);
        assert_eq!(store.history()[0].id, second.id);
        assert_eq!(store.history()[1].id, first.id);
    }

    #[test]
    fn test_default_snapshot_name_uses_scene_count() {
        let mut store = store_with_scenes(3);
        let snapshot = store.create_snapshot(None);
        assert_eq!(snapshot.name, "Snapshot (3 scenes)");
    }

    #[test]
    fn test_snapshot_is_independent_of_live_state() {
        let mut store = store_with_scenes(1);
        let scene_id = store.state().scene_groups[0].scenes[0].id.clone();
        let snapshot = store.create_snapshot(Some("before"));

        store.set_visual_prompt(&scene_id, "mutated after snapshot").unwrap();
        store.set_script_text("rewritten");

        let stored = &store.history()[0];
        assert_eq!(stored.id, snapshot.id);
        assert_eq!(stored.data.script_text, "INT. OFFICE - DAY");
        assert_eq!(stored.data.scene_groups[0].scenes[0].visual_prompt, "");
    }

    #[test]
    fn test_restore_requires_confirmation() {
        let mut store = store_with_scenes(1);
        let snapshot = store.create_snapshot(None);
        assert!(matches!(
            store.restore_snapshot(&snapshot.id, false),
            Err(BoardError::ConfirmationRequired(_))
        ));
    }

    #[test]
    fn test_restore_replaces_captured_fields_only() {
        let mut store = store_with_scenes(2);
        store.set_aspect_ratio(AspectRatio::Square);
        let snapshot = store.create_snapshot(Some("checkpoint"));

        store.set_script_text("totally different");
        store.set_aspect_ratio(AspectRatio::Portrait);
        store.set_resolution(Resolution::FourK);
        store.push_chat_message(crate::project::model::ChatMessage::user("hi"));
        store.clear_script(true).unwrap();

        store.restore_snapshot(&snapshot.id, true).unwrap();

        let state = store.state();
        assert_eq!(state.script_text, "INT. OFFICE - DAY");
        assert_eq!(state.scene_count(), 2);
        assert_eq!(state.aspect_ratio, AspectRatio::Square);
        assert_eq!(state.resolution, Resolution::OneK);
        // Chat transcript is not part of the captured data.
        assert_eq!(state.chat_messages.len(), 1);
    }

    #[test]
    fn test_restore_deep_copies_do_not_alias_history() {
        let mut store = store_with_scenes(1);
        let snapshot = store.create_snapshot(None);
        store.restore_snapshot(&snapshot.id, true).unwrap();

        let scene_id = store.state().scene_groups[0].scenes[0].id.clone();
        store.set_visual_prompt(&scene_id, "post-restore edit").unwrap();

        assert_eq!(
            store.history()[0].data.scene_groups[0].scenes[0].visual_prompt,
            ""
        );
    }

    #[test]
    fn test_restore_normalizes_untrusted_snapshot_data() {
        let mut store = store_with_scenes(1);
        let mut snapshot = store.create_snapshot(None);
        // Simulate a snapshot that predates stable ids and was captured
        // mid-generation.
        snapshot.data.scene_groups[0].scenes[0].id = String::new();
        snapshot.data.scene_groups[0].scenes[0].activity = SceneActivity::GeneratingImage;
        snapshot.data.scene_groups[0].id = String::new();
        store.replace_history(vec![snapshot.clone()]);

        store.restore_snapshot(&snapshot.id, true).unwrap();

        let state = store.state();
        assert!(!state.scene_groups[0].id.is_empty());
        let scene = &state.scene_groups[0].scenes[0];
        assert!(!scene.id.is_empty());
        assert_eq!(scene.activity, SceneActivity::Idle);
    }

    #[test]
    fn test_delete_snapshot() {
        let mut store = store_with_scenes(1);
        let a = store.create_snapshot(Some("a"));
        let b = store.create_snapshot(Some("b"));

        assert!(matches!(
            store.delete_snapshot(&a.id, false),
            Err(BoardError::ConfirmationRequired(_))
        ));
        store.delete_snapshot(&a.id, true).unwrap();
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.history()[0].id, b.id);
        assert_eq!(store.state().scene_count(), 1);

        assert!(matches!(
            store.delete_snapshot("missing", true),
            Err(BoardError::SnapshotNotFound(_))
        ));
    }

    #[test]
    fn test_auto_snapshot_name() {
        let mut store = store_with_scenes(1);
        let snapshot = store.create_auto_snapshot();
        assert_eq!(snapshot.name, AUTO_SNAPSHOT_NAME);
    }
}
