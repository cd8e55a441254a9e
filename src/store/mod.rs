//! Persistence seam for the closure workflow.
//!
//! The state machine is the only caller of [`ClosureStore`] for closure-related
//! writes. Two implementations ship with the crate:
//! - [`InMemoryStore`]: in-process fake with failure injection, used by tests
//! - [`JsonlStore`]: one JSONL file per collection, used by the CLI

mod jsonl;
mod memory;

use async_trait::async_trait;
use std::fmt;

use crate::domain::{EvaluationData, FinalReviewData, ProjectClosureState, ProjectClosureUpdate};
use crate::error::Result;

pub use jsonl::JsonlStore;
pub use memory::InMemoryStore;

/// Id of a persisted final review record
pub type ReviewId = String;

/// Id of a persisted method evaluation record
pub type EvaluationId = String;

/// Closure-related reads and writes against the project backend
#[async_trait]
pub trait ClosureStore: Send + Sync {
    /// Write the level-1 retrospective for a project
    async fn persist_final_review(&self, project_id: &str, review: &FinalReviewData) -> Result<ReviewId>;

    /// Write the level-2 retrospective for a project
    async fn persist_evaluation(&self, project_id: &str, evaluation: &EvaluationData) -> Result<EvaluationId>;

    /// Overwrite the project's lifecycle and closure fields
    async fn update_project_closure(&self, project_id: &str, update: &ProjectClosureUpdate) -> Result<()>;

    /// Read the project's current lifecycle and closure status
    async fn fetch_project_closure_state(&self, project_id: &str) -> Result<ProjectClosureState>;
}

/// The individual store calls, used to target failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    PersistFinalReview,
    PersistEvaluation,
    UpdateProjectClosure,
    FetchProjectClosureState,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreOperation::PersistFinalReview => "persist_final_review",
            StoreOperation::PersistEvaluation => "persist_evaluation",
            StoreOperation::UpdateProjectClosure => "update_project_closure",
            StoreOperation::FetchProjectClosureState => "fetch_project_closure_state",
        };
        f.write_str(name)
    }
}
