//! Data models for the storyboard project state.
//!
//! These structs mirror the JSON shapes exchanged with the browser UI and
//! the durable store, so everything serializes with camelCase field names
//! and tolerates missing fields via `#[serde(default)]`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Generates a fresh opaque identifier for scenes, groups, and snapshots.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Default display name for the n-th sequence (1-based): "Sequence 01", ...
pub fn sequence_name(n: usize) -> String {
    format!("Sequence {:02}", n)
}

// =============================================================================
// RENDER CONFIGURATION
// =============================================================================

/// Output aspect ratio for rendered frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
}

impl AspectRatio {
    /// The wire string sent to the image service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Widescreen => "16:9",
            Self::Standard => "4:3",
            Self::Square => "1:1",
            Self::Portrait => "3:4",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16:9" => Ok(Self::Widescreen),
            "4:3" => Ok(Self::Standard),
            "1:1" => Ok(Self::Square),
            "3:4" => Ok(Self::Portrait),
            other => Err(format!("unknown aspect ratio '{}'", other)),
        }
    }
}

/// Output resolution tier for rendered frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1K" => Ok(Self::OneK),
            "2K" => Ok(Self::TwoK),
            "4K" => Ok(Self::FourK),
            other => Err(format!("unknown resolution '{}'", other)),
        }
    }
}

/// Policy for chunking analysis output into scene groups.
///
/// Serialized as `"single"`, `"smart"`, or `"batch_N"` (fixed batches of N).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupingStrategy {
    /// All scenes in one group.
    #[default]
    Single,
    /// The analysis service proposes named semantic groups.
    Smart,
    /// Fixed-size batches of N scenes (N >= 1).
    Batch(usize),
}

impl fmt::Display for GroupingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::Smart => f.write_str("smart"),
            Self::Batch(n) => write!(f, "batch_{}", n),
        }
    }
}

impl FromStr for GroupingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "smart" => Ok(Self::Smart),
            other => match other.strip_prefix("batch_") {
                Some(n) => match n.parse::<usize>() {
                    Ok(n) if n >= 1 => Ok(Self::Batch(n)),
                    _ => Err(format!("invalid batch size in '{}'", other)),
                },
                None => Err(format!("unknown grouping strategy '{}'", other)),
            },
        }
    }
}

impl Serialize for GroupingStrategy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GroupingStrategy {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// SCENE
// =============================================================================

/// The long-running operation currently active on a scene.
///
/// A scene runs at most one operation at a time; the single field makes the
/// mutual-exclusion invariant structural rather than a flag convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneActivity {
    #[default]
    Idle,
    GeneratingImage,
    RegeneratingText,
    EnhancingPrompt,
}

/// One historical `{prompt, image}` pair, pushed before a prompt mutation
/// commits and popped LIFO by revert.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptVersion {
    pub prompt: String,
    pub image_url: Option<String>,
}

impl PromptVersion {
    pub fn new(prompt: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_url,
        }
    }
}

/// One storyboard shot: narrative content plus its generation status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Scene {
    /// Opaque unique identifier, stable across reorders. Never reused.
    pub id: String,
    /// Scene number from the analysis service. Informational only; not
    /// unique across groups after batching or splitting.
    pub scene_number: i32,
    pub description: String,
    /// The only field that drives image generation.
    pub visual_prompt: String,
    /// Reference to the rendered image. Cleared whenever `visual_prompt`
    /// changes, so it can never go stale relative to the prompt.
    pub image_url: Option<String>,
    pub notes: String,
    /// Undo stack of prior `{prompt, image}` pairs, newest last.
    pub prompt_history: Vec<PromptVersion>,

    /// Transient status block, rendered by the UI and reset on load/restore.
    pub activity: SceneActivity,
    pub status_message: Option<String>,
    pub error_message: Option<String>,
    pub progress: u8,
}

impl Scene {
    /// Creates a new Scene with a fresh id.
    pub fn new(scene_number: i32) -> Self {
        Self {
            id: new_id(),
            scene_number,
            ..Default::default()
        }
    }

    /// Builder: Set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: Set visual prompt.
    pub fn with_visual_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.visual_prompt = prompt.into();
        self
    }

    /// Builder: Set notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// True while any long-running operation is active on this scene.
    pub fn is_busy(&self) -> bool {
        self.activity != SceneActivity::Idle
    }

    /// Clears activity, status, error, and progress.
    pub fn reset_transient(&mut self) {
        self.activity = SceneActivity::Idle;
        self.status_message = None;
        self.error_message = None;
        self.progress = 0;
    }
}

// =============================================================================
// SCENE GROUP
// =============================================================================

/// An ordered, named section (sequence/act) of scenes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneGroup {
    pub id: String,
    pub name: String,
    /// View state only; no semantic meaning.
    pub is_collapsed: bool,
    /// Order is the narrative sequence.
    pub scenes: Vec<Scene>,
}

impl SceneGroup {
    /// Creates a new empty group with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: Set scenes.
    pub fn with_scenes(mut self, scenes: Vec<Scene>) -> Self {
        self.scenes = scenes;
        self
    }

    /// Position of a scene inside this group, by id.
    pub fn scene_index(&self, scene_id: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.id == scene_id)
    }
}

// =============================================================================
// CHAT
// =============================================================================

/// Author of a chat transcript entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    #[default]
    User,
    Model,
}

/// One entry of the append-only assistant transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

// =============================================================================
// PROJECT STATE
// =============================================================================

/// The whole live project: script, grouped scenes, render configuration,
/// and the chat transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectState {
    pub script_text: String,
    pub scene_groups: Vec<SceneGroup>,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub grouping_strategy: GroupingStrategy,
    pub chat_messages: Vec<ChatMessage>,
}

impl ProjectState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of scenes across all groups.
    pub fn scene_count(&self) -> usize {
        self.scene_groups.iter().map(|g| g.scenes.len()).sum()
    }

    /// Finds a scene by id across all groups.
    pub fn find_scene(&self, scene_id: &str) -> Option<&Scene> {
        self.scene_groups
            .iter()
            .flat_map(|g| g.scenes.iter())
            .find(|s| s.id == scene_id)
    }

    /// Finds a scene by id across all groups, mutably.
    pub fn find_scene_mut(&mut self, scene_id: &str) -> Option<&mut Scene> {
        self.scene_groups
            .iter_mut()
            .flat_map(|g| g.scenes.iter_mut())
            .find(|s| s.id == scene_id)
    }

    /// Current (group index, scene index) of a scene, by id.
    pub fn locate_scene(&self, scene_id: &str) -> Option<(usize, usize)> {
        self.scene_groups.iter().enumerate().find_map(|(gi, g)| {
            g.scene_index(scene_id).map(|si| (gi, si))
        })
    }

    /// Index of a group, by id.
    pub fn locate_group(&self, group_id: &str) -> Option<usize> {
        self.scene_groups.iter().position(|g| g.id == group_id)
    }

    /// Scene ids in group order, then scene order.
    pub fn scene_ids_in_order(&self) -> Vec<String> {
        self.scene_groups
            .iter()
            .flat_map(|g| g.scenes.iter().map(|s| s.id.clone()))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_builder() {
        let scene = Scene::new(3)
            .with_description("John enters the office")
            .with_visual_prompt("Wide shot of a cluttered office, morning light");

        assert!(!scene.id.is_empty());
        assert_eq!(scene.scene_number, 3);
        assert_eq!(scene.image_url, None);
        assert!(!scene.is_busy());
        assert!(scene.prompt_history.is_empty());
    }

    #[test]
    fn test_scene_ids_are_unique() {
        let a = Scene::new(1);
        let b = Scene::new(1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_grouping_strategy_round_trip() {
        for s in ["single", "smart", "batch_3", "batch_12"] {
            let parsed: GroupingStrategy = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        assert!("batch_0".parse::<GroupingStrategy>().is_err());
        assert!("batch_x".parse::<GroupingStrategy>().is_err());
        assert!("pairs".parse::<GroupingStrategy>().is_err());
    }

    #[test]
    fn test_config_enum_wire_strings() {
        assert_eq!(
            serde_json::to_string(&AspectRatio::Widescreen).unwrap(),
            "\"16:9\""
        );
        assert_eq!(serde_json::to_string(&Resolution::FourK).unwrap(), "\"4K\"");
        let ar: AspectRatio = serde_json::from_str("\"3:4\"").unwrap();
        assert_eq!(ar, AspectRatio::Portrait);
    }

    #[test]
    fn test_scene_serde_camel_case() {
        let mut scene = Scene::new(1).with_visual_prompt("A rainy street");
        scene.image_url = Some("blob:abc".to_string());
        let json = serde_json::to_string(&scene).unwrap();
        assert!(json.contains("\"sceneNumber\""));
        assert!(json.contains("\"visualPrompt\""));
        assert!(json.contains("\"imageUrl\""));
        assert!(json.contains("\"promptHistory\""));

        let back: Scene = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scene);
    }

    #[test]
    fn test_scene_deserialize_with_missing_fields() {
        let scene: Scene = serde_json::from_str(r#"{"id":"s-1","sceneNumber":2}"#).unwrap();
        assert_eq!(scene.id, "s-1");
        assert_eq!(scene.scene_number, 2);
        assert_eq!(scene.visual_prompt, "");
        assert_eq!(scene.activity, SceneActivity::Idle);
    }

    #[test]
    fn test_locate_scene() {
        let scene_a = Scene::new(1);
        let scene_b = Scene::new(2);
        let id_b = scene_b.id.clone();

        let state = ProjectState {
            scene_groups: vec![
                SceneGroup::new("Sequence 01").with_scenes(vec![scene_a]),
                SceneGroup::new("Sequence 02").with_scenes(vec![scene_b]),
            ],
            ..Default::default()
        };

        assert_eq!(state.scene_count(), 2);
        assert_eq!(state.locate_scene(&id_b), Some((1, 0)));
        assert_eq!(state.locate_scene("missing"), None);
        assert_eq!(state.find_scene(&id_b).unwrap().scene_number, 2);
    }

    #[test]
    fn test_reset_transient() {
        let mut scene = Scene::new(1);
        scene.activity = SceneActivity::GeneratingImage;
        scene.status_message = Some("Rendering image...".to_string());
        scene.progress = 60;

        scene.reset_transient();
        assert!(!scene.is_busy());
        assert_eq!(scene.status_message, None);
        assert_eq!(scene.progress, 0);
    }
}
