//! WASM bindings for the project store.
//!
//! JavaScript-friendly wrappers for browser use. The JS glue performs the
//! actual AI service calls; every state transition stays here so the
//! invariants (prompt/image coupling, per-scene mutual exclusion, id-based
//! lookup) are enforced in one place.

use serde::Serialize;
use serde_wasm_bindgen::Serializer;
use wasm_bindgen::prelude::*;

use crate::error::BoardError;
use crate::persist::{decode_bundle, encode_bundle};
use crate::project::model::{AspectRatio, ChatMessage, GroupingStrategy, Resolution};
use crate::project::store::{Begin, ProjectStore};
use crate::services::{FailureKind, ServiceError};

/// Serialize a value to JsValue with maps as plain JS objects (not Map).
fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&Serializer::new().serialize_maps_as_objects(true))
}

fn begin_str(begin: Begin) -> String {
    match begin {
        Begin::Started => "started",
        Begin::Busy => "busy",
        Begin::Missing => "missing",
    }
    .to_string()
}

// =============================================================================
// ERROR CONVERSION
// =============================================================================

/// Helper macro for Result conversion
macro_rules! js_result {
    ($expr:expr) => {
        $expr.map_err(|e: BoardError| JsValue::from_str(&e.to_string()))
    };
}

// =============================================================================
// MAIN WRAPPER TYPE
// =============================================================================

/// JavaScript-friendly wrapper around ProjectStore.
///
/// # Example (JavaScript)
/// ```js
/// const store = new JsProjectStore();
/// store.setScriptText("INT. OFFICE - DAY");
/// const groupId = store.addGroup(null);
/// const sceneId = store.addScene(groupId);
/// store.setVisualPrompt(sceneId, "Wide shot of a cluttered office");
/// localStorage.setItem("STORYBOARD_AI_DATA", store.toBundleJson());
/// ```
#[wasm_bindgen]
pub struct JsProjectStore {
    inner: ProjectStore,
}

impl Default for JsProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl JsProjectStore {
    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Creates an empty project store.
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsProjectStore {
        JsProjectStore {
            inner: ProjectStore::new(),
        }
    }

    /// Installs a stored bundle (the raw localStorage string), running the
    /// same schema migration as any project load. On a parse failure the
    /// current state is left untouched.
    #[wasm_bindgen(js_name = loadBundleJson)]
    pub fn load_bundle_json(&mut self, json: &str) -> Result<(), JsValue> {
        let restored = decode_bundle(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.inner.replace_history(restored.history);
        self.inner.replace_state(restored.state);
        Ok(())
    }

    /// Serializes the whole project (state + history) to the stored JSON
    /// shape for the durable store.
    #[wasm_bindgen(js_name = toBundleJson)]
    pub fn to_bundle_json(&self) -> Result<String, JsValue> {
        encode_bundle(&self.inner).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    // =========================================================================
    // STATE ACCESS
    // =========================================================================

    /// Gets the full project state as a JavaScript object.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        Ok(to_js_value(self.inner.state())?)
    }

    /// Gets the snapshot history (newest first) as a JavaScript array.
    #[wasm_bindgen(js_name = getHistory)]
    pub fn get_history(&self) -> Result<JsValue, JsValue> {
        Ok(to_js_value(&self.inner.history())?)
    }

    /// Gets the current drag state.
    #[wasm_bindgen(js_name = getDragState)]
    pub fn get_drag_state(&self) -> Result<JsValue, JsValue> {
        Ok(to_js_value(self.inner.drag())?)
    }

    // =========================================================================
    // PROJECT-LEVEL EDITS
    // =========================================================================

    /// Sets the raw script text.
    #[wasm_bindgen(js_name = setScriptText)]
    pub fn set_script_text(&mut self, text: &str) {
        self.inner.set_script_text(text);
    }

    /// Clears the script and all scene groups (requires confirmation).
    #[wasm_bindgen(js_name = clearScript)]
    pub fn clear_script(&mut self, confirmed: bool) -> Result<(), JsValue> {
        js_result!(self.inner.clear_script(confirmed))
    }

    /// Sets the aspect ratio ("16:9", "4:3", "1:1", "3:4").
    #[wasm_bindgen(js_name = setAspectRatio)]
    pub fn set_aspect_ratio(&mut self, value: &str) -> Result<(), JsValue> {
        let parsed: AspectRatio = value.parse().map_err(|e: String| JsValue::from_str(&e))?;
        self.inner.set_aspect_ratio(parsed);
        Ok(())
    }

    /// Sets the resolution ("1K", "2K", "4K").
    #[wasm_bindgen(js_name = setResolution)]
    pub fn set_resolution(&mut self, value: &str) -> Result<(), JsValue> {
        let parsed: Resolution = value.parse().map_err(|e: String| JsValue::from_str(&e))?;
        self.inner.set_resolution(parsed);
        Ok(())
    }

    /// Sets the grouping strategy ("single", "smart", "batch_N").
    #[wasm_bindgen(js_name = setGroupingStrategy)]
    pub fn set_grouping_strategy(&mut self, value: &str) -> Result<(), JsValue> {
        let parsed: GroupingStrategy = value.parse().map_err(|e: String| JsValue::from_str(&e))?;
        self.inner.set_grouping_strategy(parsed);
        Ok(())
    }

    // =========================================================================
    // GROUP OPERATIONS
    // =========================================================================

    /// Adds an empty group; returns its id.
    #[wasm_bindgen(js_name = addGroup)]
    pub fn add_group(&mut self, name: Option<String>) -> String {
        self.inner.add_group(name.as_deref())
    }

    /// Renames a group.
    #[wasm_bindgen(js_name = renameGroup)]
    pub fn rename_group(&mut self, group_id: &str, name: &str) -> Result<(), JsValue> {
        js_result!(self.inner.rename_group(group_id, name))
    }

    /// Flips a group's collapse flag.
    #[wasm_bindgen(js_name = toggleGroupCollapsed)]
    pub fn toggle_group_collapsed(&mut self, group_id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.toggle_group_collapsed(group_id))
    }

    /// Deletes a group and its scenes (requires confirmation).
    #[wasm_bindgen(js_name = deleteGroup)]
    pub fn delete_group(&mut self, group_id: &str, confirmed: bool) -> Result<(), JsValue> {
        js_result!(self.inner.delete_group(group_id, confirmed))
    }

    /// Appends a blank scene to a group; returns the new scene id.
    #[wasm_bindgen(js_name = addScene)]
    pub fn add_scene(&mut self, group_id: &str) -> Result<String, JsValue> {
        js_result!(self.inner.add_scene(group_id))
    }

    // =========================================================================
    // REORDERING
    // =========================================================================

    /// Moves a scene between positions (destination indices are
    /// pre-removal; null `toScene` appends).
    #[wasm_bindgen(js_name = moveScene)]
    pub fn move_scene(
        &mut self,
        from_group: usize,
        from_scene: usize,
        to_group: usize,
        to_scene: Option<usize>,
    ) -> Result<(), JsValue> {
        js_result!(self.inner.move_scene(from_group, from_scene, to_group, to_scene))
    }

    /// Splits a group before `sceneIndex`.
    #[wasm_bindgen(js_name = splitGroup)]
    pub fn split_group(&mut self, group_index: usize, scene_index: usize) -> Result<(), JsValue> {
        js_result!(self.inner.split_group(group_index, scene_index))
    }

    /// Merges a group into the previous one.
    #[wasm_bindgen(js_name = mergeGroupWithPrevious)]
    pub fn merge_group_with_previous(&mut self, group_index: usize) -> Result<(), JsValue> {
        js_result!(self.inner.merge_group_with_previous(group_index))
    }

    /// Records the scene being dragged.
    #[wasm_bindgen(js_name = beginDrag)]
    pub fn begin_drag(&mut self, group_id: &str, scene_id: &str) {
        self.inner.begin_drag(group_id, scene_id);
    }

    /// Records the hovered drop position (null index = end of group).
    #[wasm_bindgen(js_name = hoverDropTarget)]
    pub fn hover_drop_target(&mut self, group_id: &str, scene_index: Option<usize>) {
        self.inner.hover_drop_target(group_id, scene_index);
    }

    /// Clears all drag state.
    #[wasm_bindgen(js_name = cancelDrag)]
    pub fn cancel_drag(&mut self) {
        self.inner.cancel_drag();
    }

    /// Performs the drop described by the current drag state; drag state is
    /// cleared unconditionally.
    #[wasm_bindgen(js_name = dropDragged)]
    pub fn drop_dragged(&mut self) -> Result<(), JsValue> {
        js_result!(self.inner.drop_dragged())
    }

    // =========================================================================
    // SCENE EDITS
    // =========================================================================

    /// Sets a scene's visual prompt (pushes history, clears the image).
    #[wasm_bindgen(js_name = setVisualPrompt)]
    pub fn set_visual_prompt(&mut self, scene_id: &str, prompt: &str) -> Result<(), JsValue> {
        js_result!(self.inner.set_visual_prompt(scene_id, prompt))
    }

    /// Sets a scene's description.
    #[wasm_bindgen(js_name = setDescription)]
    pub fn set_description(&mut self, scene_id: &str, description: &str) -> Result<(), JsValue> {
        js_result!(self.inner.set_description(scene_id, description))
    }

    /// Sets a scene's notes.
    #[wasm_bindgen(js_name = setNotes)]
    pub fn set_notes(&mut self, scene_id: &str, notes: &str) -> Result<(), JsValue> {
        js_result!(self.inner.set_notes(scene_id, notes))
    }

    /// Pops the last prompt version and restores it (one level of undo).
    #[wasm_bindgen(js_name = revertPrompt)]
    pub fn revert_prompt(&mut self, scene_id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.revert_prompt(scene_id))
    }

    // =========================================================================
    // GENERATION TRANSITIONS (driven by the JS service glue)
    // =========================================================================

    /// Tries to start image generation; returns "started", "busy", or
    /// "missing".
    #[wasm_bindgen(js_name = beginImageGeneration)]
    pub fn begin_image_generation(&mut self, scene_id: &str) -> String {
        begin_str(self.inner.begin_image_generation(scene_id))
    }

    /// Tries to start a standalone prompt enhancement.
    #[wasm_bindgen(js_name = beginPromptEnhancement)]
    pub fn begin_prompt_enhancement(&mut self, scene_id: &str) -> String {
        begin_str(self.inner.begin_prompt_enhancement(scene_id))
    }

    /// Tries to start a text regeneration.
    #[wasm_bindgen(js_name = beginTextRegeneration)]
    pub fn begin_text_regeneration(&mut self, scene_id: &str) -> String {
        begin_str(self.inner.begin_text_regeneration(scene_id))
    }

    /// Records the enhanced prompt during image generation; returns false
    /// when the scene no longer exists.
    #[wasm_bindgen(js_name = applyEnhancedPrompt)]
    pub fn apply_enhanced_prompt(&mut self, scene_id: &str, enhanced: &str) -> bool {
        self.inner.apply_enhanced_prompt(scene_id, enhanced)
    }

    /// Completes image generation with the rendered image reference.
    #[wasm_bindgen(js_name = completeImageGeneration)]
    pub fn complete_image_generation(&mut self, scene_id: &str, image_url: &str) -> bool {
        self.inner.complete_image_generation(scene_id, image_url)
    }

    /// Completes a standalone prompt enhancement.
    #[wasm_bindgen(js_name = completePromptEnhancement)]
    pub fn complete_prompt_enhancement(&mut self, scene_id: &str, enhanced: &str) -> bool {
        self.inner.complete_prompt_enhancement(scene_id, enhanced)
    }

    /// Completes a text regeneration.
    #[wasm_bindgen(js_name = completeTextRegeneration)]
    pub fn complete_text_regeneration(&mut self, scene_id: &str, prompt: &str) -> bool {
        self.inner.complete_text_regeneration(scene_id, prompt)
    }

    /// Marks the scene's active operation as failed, classifying the raw
    /// provider error message ("429" / "safety" sniffing) into a
    /// user-facing one.
    #[wasm_bindgen(js_name = failSceneWithError)]
    pub fn fail_scene_with_error(&mut self, scene_id: &str, message: &str) -> bool {
        let kind = FailureKind::classify(&ServiceError::call(message));
        self.inner.fail_scene(scene_id, kind)
    }

    // =========================================================================
    // HISTORY
    // =========================================================================

    /// Captures a snapshot; returns it as a JavaScript object.
    #[wasm_bindgen(js_name = createSnapshot)]
    pub fn create_snapshot(&mut self, name: Option<String>) -> Result<JsValue, JsValue> {
        let snapshot = self.inner.create_snapshot(name.as_deref());
        Ok(to_js_value(&snapshot)?)
    }

    /// Restores a snapshot wholesale (requires confirmation).
    #[wasm_bindgen(js_name = restoreSnapshot)]
    pub fn restore_snapshot(&mut self, snapshot_id: &str, confirmed: bool) -> Result<(), JsValue> {
        js_result!(self.inner.restore_snapshot(snapshot_id, confirmed))
    }

    /// Deletes a snapshot by id (requires confirmation).
    #[wasm_bindgen(js_name = deleteSnapshot)]
    pub fn delete_snapshot(&mut self, snapshot_id: &str, confirmed: bool) -> Result<(), JsValue> {
        js_result!(self.inner.delete_snapshot(snapshot_id, confirmed))
    }

    // =========================================================================
    // CHAT
    // =========================================================================

    /// Claims the one-in-flight chat slot; false when a send is active.
    #[wasm_bindgen(js_name = beginChatSend)]
    pub fn begin_chat_send(&mut self) -> bool {
        self.inner.begin_chat_send()
    }

    /// Releases the chat slot.
    #[wasm_bindgen(js_name = endChatSend)]
    pub fn end_chat_send(&mut self) {
        self.inner.end_chat_send();
    }

    /// Whether a chat message is in flight.
    #[wasm_bindgen(js_name = isChatSending)]
    pub fn is_chat_sending(&self) -> bool {
        self.inner.is_chat_sending()
    }

    /// Appends a message to the transcript ("user" or "model").
    #[wasm_bindgen(js_name = pushChatMessage)]
    pub fn push_chat_message(&mut self, role: &str, text: &str) {
        let message = match role {
            "model" => ChatMessage::model(text),
            _ => ChatMessage::user(text),
        };
        self.inner.push_chat_message(message);
    }
}
