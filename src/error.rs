//! Error types for projclose
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::domain::LifecycleStatus;

/// All error types that can occur while closing a project
#[derive(Debug, Error)]
pub enum ClosureError {
    /// Malformed step input, raised before any store call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Operation not valid for the current step or mode
    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    /// A store call failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The project changed underneath the workflow before commit
    #[error("Project {project_id} is {found}, expected {expected}")]
    StaleProject {
        project_id: String,
        expected: String,
        found: LifecycleStatus,
    },

    /// A terminal operation is already running on this workflow
    #[error("A closure submission is already in progress")]
    SubmissionInProgress,

    /// Project not found in storage
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClosureError {
    /// Returns true for failures that happened at (or right before) the store
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            ClosureError::Persistence(_) | ClosureError::StaleProject { .. }
        )
    }

    /// Fold any store-side failure into the persistence category.
    pub(crate) fn into_persistence(self) -> Self {
        if self.is_persistence() {
            self
        } else {
            ClosureError::Persistence(self.to_string())
        }
    }
}

/// Result type alias for closure operations
pub type Result<T> = std::result::Result<T, ClosureError>;
