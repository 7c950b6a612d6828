//! Drag-and-drop reordering: scene moves, group splits, and merges.
//!
//! Every operation is an atomic replace of the whole state through
//! [`ProjectStore::update`]; a half-applied move is never observable.
//! Destination indices always refer to positions *before* the scene is
//! removed, so same-group forward moves compensate for the removal shift.

use serde::{Deserialize, Serialize};

use crate::error::{BoardError, BoardResult};
use crate::project::model::{new_id, SceneGroup};
use crate::project::store::ProjectStore;

// =============================================================================
// DRAG STATE
// =============================================================================

/// The scene currently being dragged, addressed by id so an interleaved
/// mutation cannot misdirect the drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragSource {
    pub group_id: String,
    pub scene_id: String,
}

/// The currently hovered drop position. `scene_index: None` means "append
/// to the end of the group".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTarget {
    pub group_id: String,
    pub scene_index: Option<usize>,
}

/// Transient visual-feedback state for drag-and-drop. Cleared
/// unconditionally on drop, drag-end, or cancellation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DragState {
    pub source: Option<DragSource>,
    pub target: Option<DropTarget>,
}

impl DragState {
    pub fn is_dragging(&self) -> bool {
        self.source.is_some()
    }
}

// =============================================================================
// REORDER OPERATIONS
// =============================================================================

impl ProjectStore {
    /// Moves a scene from `(from_group, from_scene)` to `to_group` at
    /// `to_scene` (`None` appends). Indices refer to positions before the
    /// removal; moving forward within one group therefore lands the scene at
    /// `to_scene - 1` after the shift. Every other scene keeps its relative
    /// order within its group.
    pub fn move_scene(
        &mut self,
        from_group: usize,
        from_scene: usize,
        to_group: usize,
        to_scene: Option<usize>,
    ) -> BoardResult<()> {
        let groups = &self.state().scene_groups;
        let group_count = groups.len();
        if from_group >= group_count {
            return Err(BoardError::index_out_of_bounds(from_group, group_count));
        }
        if to_group >= group_count {
            return Err(BoardError::index_out_of_bounds(to_group, group_count));
        }
        let source_len = groups[from_group].scenes.len();
        if from_scene >= source_len {
            return Err(BoardError::index_out_of_bounds(from_scene, source_len));
        }
        if let Some(idx) = to_scene {
            let dest_len = groups[to_group].scenes.len();
            if idx > dest_len {
                return Err(BoardError::index_out_of_bounds(idx, dest_len));
            }
        }

        self.update(|state| {
            let scene = state.scene_groups[from_group].scenes.remove(from_scene);
            let dest = &mut state.scene_groups[to_group].scenes;
            let insert_at = match to_scene {
                None => dest.len(),
                Some(idx) => {
                    // Removal shifted everything after `from_scene` left.
                    if to_group == from_group && idx > from_scene {
                        idx - 1
                    } else {
                        idx.min(dest.len())
                    }
                }
            };
            dest.insert(insert_at, scene);
        });
        Ok(())
    }

    /// Cuts a group at `scene_index`: the group keeps `[0, scene_index)` and
    /// a new group, inserted right after it, receives the rest under a
    /// derived name. A cut at 0 or past the end would create an empty group
    /// and is a no-op.
    pub fn split_group(&mut self, group_index: usize, scene_index: usize) -> BoardResult<()> {
        let groups = &self.state().scene_groups;
        if group_index >= groups.len() {
            return Err(BoardError::index_out_of_bounds(group_index, groups.len()));
        }
        if scene_index == 0 || scene_index >= groups[group_index].scenes.len() {
            return Ok(());
        }

        self.update(|state| {
            let group = &mut state.scene_groups[group_index];
            let tail = group.scenes.split_off(scene_index);
            let new_group = SceneGroup {
                id: new_id(),
                name: format!("{} (Split)", group.name),
                is_collapsed: false,
                scenes: tail,
            };
            state.scene_groups.insert(group_index + 1, new_group);
        });
        Ok(())
    }

    /// Appends a group's scenes onto the previous group, then removes the
    /// group. Scenes are absorbed, never destroyed. A merge at index 0 is a
    /// no-op.
    pub fn merge_group_with_previous(&mut self, group_index: usize) -> BoardResult<()> {
        let group_count = self.state().scene_groups.len();
        if group_index >= group_count {
            return Err(BoardError::index_out_of_bounds(group_index, group_count));
        }
        if group_index == 0 {
            return Ok(());
        }

        self.update(|state| {
            let removed = state.scene_groups.remove(group_index);
            state.scene_groups[group_index - 1]
                .scenes
                .extend(removed.scenes);
        });
        Ok(())
    }

    // =========================================================================
    // DRAG FEEDBACK
    // =========================================================================

    /// Current drag-and-drop state.
    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    /// Records the scene being dragged.
    pub fn begin_drag(&mut self, group_id: &str, scene_id: &str) {
        self.drag.source = Some(DragSource {
            group_id: group_id.to_string(),
            scene_id: scene_id.to_string(),
        });
        self.drag.target = None;
    }

    /// Records the hovered drop position (`None` scene index = end of group).
    pub fn hover_drop_target(&mut self, group_id: &str, scene_index: Option<usize>) {
        if self.drag.source.is_some() {
            self.drag.target = Some(DropTarget {
                group_id: group_id.to_string(),
                scene_index,
            });
        }
    }

    /// Clears all drag state. Safe to call at any time.
    pub fn cancel_drag(&mut self) {
        self.drag = DragState::default();
    }

    /// Performs the move described by the current drag state, resolving both
    /// ends by id against the state as it is *now*. Drag state is cleared
    /// unconditionally, even when the drop cannot be performed.
    pub fn drop_dragged(&mut self) -> BoardResult<()> {
        let drag = std::mem::take(&mut self.drag);
        let (source, target) = match (drag.source, drag.target) {
            (Some(source), Some(target)) => (source, target),
            _ => return Ok(()),
        };

        let (from_group, from_scene) = match self.state().locate_scene(&source.scene_id) {
            Some(position) => position,
            // Scene vanished while dragging (deleted, merged away upstream of
            // a concurrent edit); the drop quietly dissolves.
            None => return Ok(()),
        };
        let to_group = match self.state().locate_group(&target.group_id) {
            Some(idx) => idx,
            None => return Ok(()),
        };
        // The hovered index was captured at hover time; clamp it to the
        // group as it is now.
        let to_scene = target
            .scene_index
            .map(|idx| idx.min(self.state().scene_groups[to_group].scenes.len()));

        self.move_scene(from_group, from_scene, to_group, to_scene)
    }
}

// =============================================================================
// TESTS
// =============================================================================
