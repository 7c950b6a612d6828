//! Error types for the storyboard project engine.

use thiserror::Error;

use crate::services::ServiceError;

/// Result type alias for project-state operations.
pub type BoardResult<T> = Result<T, BoardError>;

/// Errors that can occur while operating on the project state machine.
#[derive(Error, Debug)]
pub enum BoardError {
    /// Scene not found in any group.
    #[error("Scene not found: {0}")]
    SceneNotFound(String),

    /// Scene group not found.
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Snapshot not found in the project history.
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// Index out of bounds for list operations.
    #[error("Index {index} out of bounds for list of length {length}")]
    IndexOutOfBounds { index: usize, length: usize },

    /// A destructive operation was attempted without user confirmation.
    #[error("Confirmation required before {0}")]
    ConfirmationRequired(String),

    /// Script analysis requires a non-empty script.
    #[error("Cannot analyze an empty script")]
    EmptyScript,

    /// The analysis response was unusable (service failure or a response
    /// shape that does not match the requested grouping strategy).
    #[error("Script analysis failed: {0}")]
    AnalysisFailed(String),

    /// A chat message is already in flight.
    #[error("A chat message is already being sent")]
    ChatBusy,

    /// External service failure.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl BoardError {
    /// Creates a SceneNotFound error.
    pub fn scene_not_found(id: impl Into<String>) -> Self {
        Self::SceneNotFound(id.into())
    }

    /// Creates a GroupNotFound error.
    pub fn group_not_found(id: impl Into<String>) -> Self {
        Self::GroupNotFound(id.into())
    }

    /// Creates a SnapshotNotFound error.
    pub fn snapshot_not_found(id: impl Into<String>) -> Self {
        Self::SnapshotNotFound(id.into())
    }

    /// Creates an IndexOutOfBounds error.
    pub fn index_out_of_bounds(index: usize, length: usize) -> Self {
        Self::IndexOutOfBounds { index, length }
    }

    /// Creates a ConfirmationRequired error naming the gated action.
    pub fn confirmation_required(action: impl Into<String>) -> Self {
        Self::ConfirmationRequired(action.into())
    }

    /// Creates an AnalysisFailed error.
    pub fn analysis_failed(msg: impl Into<String>) -> Self {
        Self::AnalysisFailed(msg.into())
    }
}
