//! Schema migration from stored JSON shapes to live model types.
//!
//! Detection is structural: a payload with `sceneGroups` is current, one
//! with only a flat `scenes` list is legacy and gets wrapped into a single
//! synthesized group. Missing ids are backfilled, unknown enum strings fall
//! back to defaults, and transient generation status never survives a load.
//! The whole pass is pure so it can be tested in isolation.

use crate::history::{ProjectSnapshot, SnapshotData};
use crate::persist::input::{
    StoredBundle, StoredChatMessage, StoredGroup, StoredPromptVersion, StoredScene, StoredSnapshot,
};
use crate::project::model::{
    new_id, sequence_name, AspectRatio, ChatMessage, ChatRole, ProjectState, PromptVersion,
    Resolution, Scene, SceneGroup,
};

/// Name of the group synthesized when wrapping a legacy flat project.
pub const LEGACY_GROUP_NAME: &str = "Sequence 01";

/// Name of the group synthesized when restoring a legacy flat snapshot.
pub const RESTORED_GROUP_NAME: &str = "Restored Sequence";

/// A fully migrated project: live state plus snapshot history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoredProject {
    pub state: ProjectState,
    pub history: Vec<ProjectSnapshot>,
}

/// Migrates a stored bundle into live types. Every field restores
/// independently; anything absent or unparseable falls back to its default.
pub fn restore_bundle(bundle: StoredBundle) -> RestoredProject {
    let state = ProjectState {
        script_text: bundle.script,
        scene_groups: normalize_groups(bundle.scene_groups, bundle.scenes, LEGACY_GROUP_NAME),
        aspect_ratio: parse_or_default::<AspectRatio>(bundle.aspect_ratio.as_deref()),
        resolution: parse_or_default::<Resolution>(bundle.resolution.as_deref()),
        // The grouping strategy is a request-time setting and is not part of
        // the stored bundle.
        grouping_strategy: Default::default(),
        chat_messages: bundle.chat_history.into_iter().map(chat_from_stored).collect(),
    };
    let history = bundle
        .project_history
        .into_iter()
        .map(snapshot_from_stored)
        .collect();
    RestoredProject { state, history }
}

/// Resolves the grouped-vs-legacy layout and normalizes the result.
///
/// - `sceneGroups` present: adopt it, backfilling missing ids and names.
/// - only legacy `scenes` present: wrap all of them, in order, into one
///   synthesized group named `fallback_name`.
/// - neither: empty board.
pub fn normalize_groups(
    groups: Option<Vec<StoredGroup>>,
    legacy_scenes: Option<Vec<StoredScene>>,
    fallback_name: &str,
) -> Vec<SceneGroup> {
    match (groups, legacy_scenes) {
        (Some(groups), _) => groups
            .into_iter()
            .enumerate()
            .map(|(i, g)| group_from_stored(g, i))
            .collect(),
        (None, Some(scenes)) => {
            log::debug!(
                "migrating legacy flat layout: wrapping {} scenes into '{}'",
                scenes.len(),
                fallback_name
            );
            vec![SceneGroup {
                id: new_id(),
                name: fallback_name.to_string(),
                is_collapsed: false,
                scenes: scenes.into_iter().map(scene_from_stored).collect(),
            }]
        }
        (None, None) => Vec::new(),
    }
}

/// Backfills ids and names and resets transient status on live groups.
/// Used when restoring snapshot data that is already in the grouped shape
/// but cannot be trusted to match the current schema.
pub fn normalize_groups_in_place(groups: &mut [SceneGroup]) {
    for (i, group) in groups.iter_mut().enumerate() {
        if group.id.is_empty() {
            group.id = new_id();
        }
        if group.name.is_empty() {
            group.name = sequence_name(i + 1);
        }
        for scene in &mut group.scenes {
            if scene.id.is_empty() {
                scene.id = new_id();
            }
            scene.reset_transient();
        }
    }
}

fn group_from_stored(group: StoredGroup, index: usize) -> SceneGroup {
    SceneGroup {
        id: non_empty(group.id).unwrap_or_else(new_id),
        name: non_empty(group.name).unwrap_or_else(|| sequence_name(index + 1)),
        is_collapsed: group.is_collapsed,
        scenes: group.scenes.into_iter().map(scene_from_stored).collect(),
    }
}

fn scene_from_stored(scene: StoredScene) -> Scene {
    Scene {
        id: non_empty(scene.id).unwrap_or_else(new_id),
        scene_number: scene.scene_number,
        description: scene.description,
        visual_prompt: scene.visual_prompt,
        image_url: scene.image_url,
        notes: scene.notes,
        prompt_history: scene
            .prompt_history
            .into_iter()
            .map(prompt_version_from_stored)
            .collect(),
        ..Default::default()
    }
}

fn prompt_version_from_stored(version: StoredPromptVersion) -> PromptVersion {
    PromptVersion {
        prompt: version.prompt,
        image_url: version.image_url,
    }
}

fn chat_from_stored(message: StoredChatMessage) -> ChatMessage {
    let role = match message.role.as_str() {
        "model" => ChatRole::Model,
        _ => ChatRole::User,
    };
    ChatMessage {
        role,
        text: message.text,
    }
}

fn snapshot_from_stored(snapshot: StoredSnapshot) -> ProjectSnapshot {
    let data = snapshot.data;
    ProjectSnapshot {
        id: non_empty(snapshot.id).unwrap_or_else(new_id),
        name: snapshot.name,
        timestamp: snapshot.timestamp,
        data: SnapshotData {
            script_text: data.script_text.or(data.script).unwrap_or_default(),
            scene_groups: normalize_groups(data.scene_groups, data.scenes, RESTORED_GROUP_NAME),
            aspect_ratio: parse_or_default::<AspectRatio>(data.aspect_ratio.as_deref()),
            resolution: parse_or_default::<Resolution>(data.resolution.as_deref()),
        },
    }
}

fn parse_or_default<T: std::str::FromStr + Default>(value: Option<&str>) -> T {
    value.and_then(|s| s.parse().ok()).unwrap_or_default()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_scene(id: Option<&str>, number: i32) -> StoredScene {
        StoredScene {
            id: id.map(str::to_string),
            scene_number: number,
            description: format!("scene {}", number),
            visual_prompt: format!("prompt {}", number),
            ..Default::default()
        }
    }

    #[test]
    fn test_legacy_flat_scenes_wrap_into_one_group() {
        let scenes = vec![
            stored_scene(None, 1),
            stored_scene(Some("s-2"), 2),
            stored_scene(None, 3),
        ];

        let groups = normalize_groups(None, Some(scenes), LEGACY_GROUP_NAME);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Sequence 01");
        assert!(!groups[0].id.is_empty());
        let numbers: Vec<i32> = groups[0].scenes.iter().map(|s| s.scene_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        // Missing ids backfilled, present ids kept.
        assert!(!groups[0].scenes[0].id.is_empty());
        assert_eq!(groups[0].scenes[1].id, "s-2");
    }

    #[test]
    fn test_grouped_payload_passes_through() {
        let groups = vec![StoredGroup {
            id: Some("g-1".to_string()),
            name: Some("Act One".to_string()),
            is_collapsed: true,
            scenes: vec![stored_scene(Some("s-1"), 1)],
        }];

        let out = normalize_groups(Some(groups), None, LEGACY_GROUP_NAME);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "g-1");
        assert_eq!(out[0].name, "Act One");
        assert!(out[0].is_collapsed);
        assert_eq!(out[0].scenes[0].id, "s-1");
        assert_eq!(out[0].scenes[0].visual_prompt, "prompt 1");
    }

    #[test]
    fn test_grouped_layout_wins_when_both_keys_present() {
        let groups = vec![StoredGroup {
            id: None,
            name: None,
            is_collapsed: false,
            scenes: vec![stored_scene(None, 1)],
        }];
        let legacy = vec![stored_scene(None, 9)];

        let out = normalize_groups(Some(groups), Some(legacy), LEGACY_GROUP_NAME);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].scenes[0].scene_number, 1);
    }

    #[test]
    fn test_missing_group_name_defaults_by_position() {
        let groups = vec![
            StoredGroup::default(),
            StoredGroup {
                name: Some(String::new()),
                ..Default::default()
            },
        ];
        let out = normalize_groups(Some(groups), None, LEGACY_GROUP_NAME);
        assert_eq!(out[0].name, "Sequence 01");
        assert_eq!(out[1].name, "Sequence 02");
    }

    #[test]
    fn test_restore_bundle_defaults_for_garbage_config() {
        let bundle: StoredBundle = serde_json::from_str(
            r#"{"script":"abc","aspectRatio":"21:9","resolution":"8K","scenes":[]}"#,
        )
        .unwrap();

        let restored = restore_bundle(bundle);
        assert_eq!(restored.state.script_text, "abc");
        assert_eq!(restored.state.aspect_ratio, AspectRatio::default());
        assert_eq!(restored.state.resolution, Resolution::default());
        // Legacy key present (even empty) still synthesizes the group.
        assert_eq!(restored.state.scene_groups.len(), 1);
    }

    #[test]
    fn test_restore_bundle_chat_roles() {
        let bundle: StoredBundle = serde_json::from_str(
            r#"{"chatHistory":[{"role":"user","text":"hi"},{"role":"model","text":"hello"},{"role":"??","text":"x"}]}"#,
        )
        .unwrap();

        let restored = restore_bundle(bundle);
        let roles: Vec<ChatRole> = restored.state.chat_messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Model, ChatRole::User]);
    }

    #[test]
    fn test_legacy_snapshot_data_wraps_as_restored_sequence() {
        let bundle: StoredBundle = serde_json::from_str(
            r#"{
                "projectHistory":[{
                    "id":"snap-1",
                    "name":"old save",
                    "timestamp":1700000000000,
                    "data":{"script":"old script","scenes":[{"sceneNumber":1}]}
                }]
            }"#,
        )
        .unwrap();

        let restored = restore_bundle(bundle);
        assert_eq!(restored.history.len(), 1);
        let snapshot = &restored.history[0];
        assert_eq!(snapshot.id, "snap-1");
        assert_eq!(snapshot.data.script_text, "old script");
        assert_eq!(snapshot.data.scene_groups.len(), 1);
        assert_eq!(snapshot.data.scene_groups[0].name, RESTORED_GROUP_NAME);
        assert!(!snapshot.data.scene_groups[0].scenes[0].id.is_empty());
    }

    #[test]
    fn test_migration_is_idempotent_on_current_shape() {
        let scenes = vec![stored_scene(None, 1), stored_scene(None, 2)];
        let first = normalize_groups(None, Some(scenes), LEGACY_GROUP_NAME);

        // Re-serialize the migrated result and run it through again.
        let json = serde_json::to_string(&first).unwrap();
        let reparsed: Vec<StoredGroup> = serde_json::from_str(&json).unwrap();
        let second = normalize_groups(Some(reparsed), None, LEGACY_GROUP_NAME);

        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_groups_in_place() {
        let mut groups = vec![SceneGroup {
            id: String::new(),
            name: String::new(),
            is_collapsed: false,
            scenes: vec![Scene {
                id: String::new(),
                progress: 60,
                ..Default::default()
            }],
        }];

        normalize_groups_in_place(&mut groups);

        assert!(!groups[0].id.is_empty());
        assert_eq!(groups[0].name, "Sequence 01");
        assert!(!groups[0].scenes[0].id.is_empty());
        assert_eq!(groups[0].scenes[0].progress, 0);
    }
}
