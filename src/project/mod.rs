//! Project state module.
//!
//! This module provides:
//! - `model`: data structures for the project (Scene, SceneGroup, render
//!   configuration, chat transcript)
//! - `store`: the copy-on-write state holder with subscriber notification
//! - `reorder`: drag-and-drop move/split/merge operations

pub mod model;
pub mod reorder;
pub mod store;

pub use model::{
    AspectRatio, ChatMessage, ChatRole, GroupingStrategy, ProjectState, PromptVersion, Resolution,
    Scene, SceneActivity, SceneGroup,
};
pub use reorder::{DragSource, DragState, DropTarget};
pub use store::{Begin, ProjectStore, Subscriber};
