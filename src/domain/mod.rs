//! Domain types for projclose
//!
//! - ClosureStep: the ordered screens of the closure workflow
//! - FinalReviewData / EvaluationData: the two retrospective levels
//! - Project: the closure-related fields of a portfolio project
//! - Actor: who drives the workflow

pub mod actor;
pub mod project;
pub mod review;
pub mod step;

pub use actor::{Actor, ActorRole};
pub use project::{
    ClosureStatus, LifecycleStatus, Project, ProjectClosureState, ProjectClosureUpdate,
};
pub use review::{
    EvaluationData, EvaluationRecord, FinalReviewData, FinalReviewInput, FinalReviewRecord,
    Progress, Weather,
};
pub use step::ClosureStep;
