//! The project state holder.
//!
//! `ProjectStore` owns the single shared mutable value of the whole engine:
//! the live [`ProjectState`], the snapshot history, and transient view state
//! (drag, chat guard). Every mutation goes through [`ProjectStore::update`],
//! which clones the current state, applies the change, and replaces the
//! value wholesale — in-place mutation of the shared value is never
//! observable, and subscribers are notified after each replacement.
//!
//! Long-running operations address scenes by id and re-resolve the position
//! at every mutation point, so a reorder that lands between two await points
//! of an in-flight generation cannot misdirect the completion handler.

use crate::error::{BoardError, BoardResult};
use crate::history::ProjectSnapshot;
use crate::project::model::{
    sequence_name, AspectRatio, ChatMessage, GroupingStrategy, ProjectState, PromptVersion,
    Resolution, Scene, SceneActivity, SceneGroup,
};
use crate::project::reorder::DragState;
use crate::services::FailureKind;

/// Callback invoked after every store mutation. Subscribers read the store
/// synchronously through the borrow; they must not call back into it.
pub type Subscriber = Box<dyn Fn(&ProjectStore) + Send>;

/// Outcome of attempting to start a long-running operation on a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    /// The operation was started and the scene is now busy.
    Started,
    /// Another operation is already active on this scene; the attempt is a
    /// no-op, not an error.
    Busy,
    /// No scene with this id exists.
    Missing,
}

/// The single shared mutable resource: live project state plus history and
/// transient view state, behind copy-on-write replace semantics.
pub struct ProjectStore {
    pub(crate) state: ProjectState,
    /// Snapshot history, newest first.
    pub(crate) history: Vec<ProjectSnapshot>,
    /// Drag-and-drop feedback state. Not part of the project value.
    pub(crate) drag: DragState,
    /// One chat message in flight at a time.
    pub(crate) chat_sending: bool,
    subscribers: Vec<(usize, Subscriber)>,
    next_subscriber_id: usize,
}

impl ProjectStore {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_state(ProjectState::new())
    }

    /// Creates a store around an existing state value.
    pub fn with_state(state: ProjectState) -> Self {
        Self {
            state,
            history: Vec::new(),
            drag: DragState::default(),
            chat_sending: false,
            subscribers: Vec::new(),
            next_subscriber_id: 0,
        }
    }

    // =========================================================================
    // STATE ACCESS
    // =========================================================================

    /// Borrows the current state.
    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    /// Returns an owned deep copy of the current state.
    pub fn get_state(&self) -> ProjectState {
        self.state.clone()
    }

    /// Snapshot history, newest first.
    pub fn history(&self) -> &[ProjectSnapshot] {
        &self.history
    }

    /// Replaces the state wholesale and notifies subscribers.
    pub fn replace_state(&mut self, next: ProjectState) {
        self.state = next;
        self.notify();
    }

    /// Clones the current state, applies `f`, replaces the value wholesale,
    /// and notifies subscribers. This is the only mutation path for the
    /// project value.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&mut ProjectState),
    {
        let mut next = self.state.clone();
        f(&mut next);
        self.state = next;
        self.notify();
    }

    /// Applies `f` to the scene with the given id, if it still exists.
    /// Returns whether the scene was found. Position is resolved by id at
    /// call time, never by a captured index.
    pub fn update_scene<F>(&mut self, scene_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Scene),
    {
        let mut found = false;
        self.update(|state| {
            if let Some(scene) = state.find_scene_mut(scene_id) {
                f(scene);
                found = true;
            }
        });
        found
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Registers a subscriber; returns a token for [`Self::unsubscribe`].
    pub fn subscribe(&mut self, subscriber: Subscriber) -> usize {
        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    /// Removes a subscriber by token.
    pub fn unsubscribe(&mut self, token: usize) {
        self.subscribers.retain(|(id, _)| *id != token);
    }

    pub(crate) fn notify(&self) {
        for (_, subscriber) in &self.subscribers {
            subscriber(self);
        }
    }

    // =========================================================================
    // PROJECT-LEVEL EDITS
    // =========================================================================

    /// Sets the raw script text.
    pub fn set_script_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.update(|state| state.script_text = text);
    }

    /// Clears the script and all scene groups. Destructive; gated on
    /// explicit confirmation.
    pub fn clear_script(&mut self, confirmed: bool) -> BoardResult<()> {
        if !confirmed {
            return Err(BoardError::confirmation_required("clearing the script"));
        }
        self.update(|state| {
            state.script_text.clear();
            state.scene_groups.clear();
        });
        Ok(())
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.update(|state| state.aspect_ratio = aspect_ratio);
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.update(|state| state.resolution = resolution);
    }

    pub fn set_grouping_strategy(&mut self, strategy: GroupingStrategy) {
        self.update(|state| state.grouping_strategy = strategy);
    }

    /// Appends a message to the chat transcript.
    pub fn push_chat_message(&mut self, message: ChatMessage) {
        self.update(|state| state.chat_messages.push(message));
    }

    /// Claims the one-in-flight chat slot. Returns false when a send is
    /// already active.
    pub fn begin_chat_send(&mut self) -> bool {
        if self.chat_sending {
            return false;
        }
        self.chat_sending = true;
        true
    }

    /// Releases the chat slot. Always called, success or failure.
    pub fn end_chat_send(&mut self) {
        self.chat_sending = false;
    }

    /// Whether a chat message is currently in flight.
    pub fn is_chat_sending(&self) -> bool {
        self.chat_sending
    }

    // =========================================================================
    // GROUP EDITS
    // =========================================================================

    /// Appends a new empty group; returns its id. A missing name defaults to
    /// the next "Sequence NN".
    pub fn add_group(&mut self, name: Option<&str>) -> String {
        let default_name = sequence_name(self.state.scene_groups.len() + 1);
        let group = SceneGroup::new(name.unwrap_or(&default_name));
        let id = group.id.clone();
        self.update(|state| state.scene_groups.push(group));
        id
    }

    /// Renames a group.
    pub fn rename_group(&mut self, group_id: &str, name: impl Into<String>) -> BoardResult<()> {
        let name = name.into();
        let mut found = false;
        self.update(|state| {
            if let Some(idx) = state.locate_group(group_id) {
                state.scene_groups[idx].name = name;
                found = true;
            }
        });
        if found {
            Ok(())
        } else {
            Err(BoardError::group_not_found(group_id))
        }
    }

    /// Flips the collapse flag. View state only.
    pub fn toggle_group_collapsed(&mut self, group_id: &str) -> BoardResult<()> {
        let mut found = false;
        self.update(|state| {
            if let Some(idx) = state.locate_group(group_id) {
                let group = &mut state.scene_groups[idx];
                group.is_collapsed = !group.is_collapsed;
                found = true;
            }
        });
        if found {
            Ok(())
        } else {
            Err(BoardError::group_not_found(group_id))
        }
    }

    /// Deletes a group and every scene in it. Destructive; gated on
    /// explicit confirmation.
    pub fn delete_group(&mut self, group_id: &str, confirmed: bool) -> BoardResult<()> {
        if !confirmed {
            return Err(BoardError::confirmation_required("deleting a group"));
        }
        if self.state.locate_group(group_id).is_none() {
            return Err(BoardError::group_not_found(group_id));
        }
        self.update(|state| state.scene_groups.retain(|g| g.id != group_id));
        Ok(())
    }

    /// Appends a blank scene to a group; returns the new scene id.
    pub fn add_scene(&mut self, group_id: &str) -> BoardResult<String> {
        let scene = Scene::new(self.state.scene_count() as i32 + 1);
        let scene_id = scene.id.clone();
        let mut found = false;
        self.update(|state| {
            if let Some(idx) = state.locate_group(group_id) {
                state.scene_groups[idx].scenes.push(scene);
                found = true;
            }
        });
        if found {
            Ok(scene_id)
        } else {
            Err(BoardError::group_not_found(group_id))
        }
    }

    // =========================================================================
    // SCENE EDITS
    // =========================================================================

    /// Sets a scene's visual prompt. A changed prompt pushes the previous
    /// `{prompt, image}` pair onto the history and clears the image in the
    /// same update; an unchanged prompt is a no-op.
    pub fn set_visual_prompt(&mut self, scene_id: &str, prompt: &str) -> BoardResult<()> {
        if self
            .update_scene(scene_id, |scene| commit_prompt_change(scene, prompt))
        {
            Ok(())
        } else {
            Err(BoardError::scene_not_found(scene_id))
        }
    }

    /// Sets a scene's description. No side effects on the image.
    pub fn set_description(&mut self, scene_id: &str, description: &str) -> BoardResult<()> {
        if self.update_scene(scene_id, |scene| scene.description = description.to_string()) {
            Ok(())
        } else {
            Err(BoardError::scene_not_found(scene_id))
        }
    }

    /// Sets a scene's notes. No side effects.
    pub fn set_notes(&mut self, scene_id: &str, notes: &str) -> BoardResult<()> {
        if self.update_scene(scene_id, |scene| scene.notes = notes.to_string()) {
            Ok(())
        } else {
            Err(BoardError::scene_not_found(scene_id))
        }
    }

    /// Sets a scene's display number. Informational only.
    pub fn set_scene_number(&mut self, scene_id: &str, scene_number: i32) -> BoardResult<()> {
        if self.update_scene(scene_id, |scene| scene.scene_number = scene_number) {
            Ok(())
        } else {
            Err(BoardError::scene_not_found(scene_id))
        }
    }

    /// Pops the most recent prompt version (LIFO) and restores it, image
    /// included, clearing any transient status. Empty history is a no-op.
    pub fn revert_prompt(&mut self, scene_id: &str) -> BoardResult<()> {
        if self.update_scene(scene_id, |scene| {
            if let Some(version) = scene.prompt_history.pop() {
                scene.visual_prompt = version.prompt;
                scene.image_url = version.image_url;
                scene.reset_transient();
            }
        }) {
            Ok(())
        } else {
            Err(BoardError::scene_not_found(scene_id))
        }
    }

    // =========================================================================
    // SCENE TRANSITIONS (generation state machine)
    // =========================================================================

    /// Tries to start image generation on a scene.
    pub fn begin_image_generation(&mut self, scene_id: &str) -> Begin {
        self.begin_activity(scene_id, SceneActivity::GeneratingImage, "Enhancing prompt...")
    }

    /// Tries to start a standalone prompt enhancement.
    pub fn begin_prompt_enhancement(&mut self, scene_id: &str) -> Begin {
        self.begin_activity(scene_id, SceneActivity::EnhancingPrompt, "Enhancing prompt...")
    }

    /// Tries to start regenerating the visual prompt from the description.
    pub fn begin_text_regeneration(&mut self, scene_id: &str) -> Begin {
        self.begin_activity(
            scene_id,
            SceneActivity::RegeneratingText,
            "Rewriting visual prompt...",
        )
    }

    fn begin_activity(
        &mut self,
        scene_id: &str,
        activity: SceneActivity,
        status: &str,
    ) -> Begin {
        let mut outcome = Begin::Missing;
        self.update(|state| {
            if let Some(scene) = state.find_scene_mut(scene_id) {
                if scene.is_busy() {
                    outcome = Begin::Busy;
                } else {
                    scene.activity = activity;
                    scene.status_message = Some(status.to_string());
                    scene.error_message = None;
                    scene.progress = 10;
                    outcome = Begin::Started;
                }
            }
        });
        outcome
    }

    /// Records the enhancement step of the image workflow: advances progress
    /// through 40 to 60, commits the enhanced prompt when it differs from
    /// the current one, and flips the status to rendering. Returns whether
    /// the scene still exists.
    pub fn apply_enhanced_prompt(&mut self, scene_id: &str, enhanced: &str) -> bool {
        self.update_scene(scene_id, |scene| {
            scene.progress = 40;
            commit_prompt_change(scene, enhanced);
            scene.progress = 60;
            scene.status_message = Some("Rendering image...".to_string());
        })
    }

    /// Completes image generation: stores the image and clears the busy
    /// state. Returns whether the scene still exists.
    pub fn complete_image_generation(&mut self, scene_id: &str, image_url: &str) -> bool {
        self.update_scene(scene_id, |scene| {
            scene.image_url = Some(image_url.to_string());
            scene.activity = SceneActivity::Idle;
            scene.status_message = None;
            scene.error_message = None;
            scene.progress = 100;
        })
    }

    /// Completes a standalone prompt enhancement.
    pub fn complete_prompt_enhancement(&mut self, scene_id: &str, enhanced: &str) -> bool {
        self.update_scene(scene_id, |scene| {
            commit_prompt_change(scene, enhanced);
            scene.reset_transient();
        })
    }

    /// Completes a text regeneration with the rewritten prompt.
    pub fn complete_text_regeneration(&mut self, scene_id: &str, prompt: &str) -> bool {
        self.update_scene(scene_id, |scene| {
            commit_prompt_change(scene, prompt);
            scene.reset_transient();
        })
    }

    /// Marks a scene's active operation as failed with a classified,
    /// user-facing message. Returns whether the scene still exists.
    pub fn fail_scene(&mut self, scene_id: &str, kind: FailureKind) -> bool {
        self.update_scene(scene_id, |scene| {
            scene.activity = SceneActivity::Idle;
            scene.status_message = Some("Failed".to_string());
            scene.error_message = Some(kind.user_message().to_string());
            scene.progress = 0;
        })
    }
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Pushes the current `{prompt, image}` pair and installs the new prompt,
/// clearing the image in the same mutation. Unchanged text is a no-op so
/// idempotent enhancement responses neither grow history nor drop images.
fn commit_prompt_change(scene: &mut Scene, new_prompt: &str) {
    if scene.visual_prompt == new_prompt {
        return;
    }
    scene.prompt_history.push(PromptVersion::new(
        scene.visual_prompt.clone(),
        scene.image_url.take(),
    ));
    scene.visual_prompt = new_prompt.to_string();
}

// =============================================================================
// TESTS
// =============================================================================
