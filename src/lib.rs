//! Shotdeck - project state engine for AI-assisted storyboard authoring.
//!
//! This crate implements the client-side state machine behind a storyboard
//! tool: scenes and scene groups, drag-and-drop reordering, per-scene
//! prompt-edit history, snapshot versioning, and durable-store persistence
//! with structural schema migration. External AI services (script analysis,
//! prompt enhancement, image rendering, chat) sit behind async traits; the
//! orchestrator drives them per scene without ever letting two operations
//! run on the same scene at once.
//!
//! All state lives in a single [`ProjectStore`] with copy-on-write replace
//! semantics: mutations clone the current value, apply the change, and swap
//! the whole value in, notifying subscribers. Async workflows address
//! scenes by id and re-resolve positions at every mutation point, so
//! concurrent edits can interleave safely at await boundaries.
//!
//! # Example
//!
//! ```rust
//! use shotdeck::ProjectStore;
//!
//! let mut store = ProjectStore::new();
//! store.set_script_text("INT. OFFICE - DAY");
//!
//! let group_id = store.add_group(None);
//! let scene_id = store.add_scene(&group_id).unwrap();
//! store
//!     .set_visual_prompt(&scene_id, "Wide shot of a cluttered office")
//!     .unwrap();
//!
//! // Save a restorable checkpoint, then branch freely.
//! let snapshot = store.create_snapshot(Some("first pass"));
//! store.set_visual_prompt(&scene_id, "Close-up on the desk").unwrap();
//! store.restore_snapshot(&snapshot.id, true).unwrap();
//!
//! let scene = store.state().find_scene(&scene_id).unwrap();
//! assert_eq!(scene.visual_prompt, "Wide shot of a cluttered office");
//! ```

pub mod analysis;
pub mod error;
pub mod generate;
pub mod history;
pub mod persist;
pub mod project;
pub mod services;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use analysis::AnalysisWorkflow;
pub use error::{BoardError, BoardResult};
pub use generate::{ChatWorkflow, GenerationOrchestrator, SharedStore, SweepSummary};
pub use history::{ProjectSnapshot, SnapshotData};
pub use persist::{
    KeyValueStore, LoadOutcome, MemoryStore, PersistError, PersistenceAdapter, StoreError,
    STORAGE_KEY,
};
pub use project::{
    AspectRatio, Begin, ChatMessage, ChatRole, DragState, GroupingStrategy, ProjectState,
    ProjectStore, PromptVersion, Resolution, Scene, SceneActivity, SceneGroup,
};
pub use services::{
    AnalysisResponse, AnalyzedGroup, AnalyzedScene, ChatSession, FailureKind, ImageGenerator,
    PromptEnhancer, RenderRequest, ScriptAnalyzer, ServiceError,
};

#[cfg(feature = "gateway")]
pub use services::gateway::{GatewayChatSession, GatewayClient};

#[cfg(feature = "wasm")]
pub use wasm::JsProjectStore;
