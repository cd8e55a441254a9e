//! Project closure workflow
//!
//! `intro → final_review → method_evaluation → confirmation`, ending in one of
//! three terminal writes: close, close with the evaluation postponed, or
//! record a postponed evaluation.

pub mod machine;
pub mod reactivation;
pub mod state;
pub mod validation;


pub use machine::{ClosureReceipt, ClosureStateMachine};
pub use reactivation::reactivate_project;
pub use state::{
    ClosureMode, ClosureOutcome, ClosureState, StepChange, StepIndicator, StepMarker,
};
pub use validation::{validate_evaluation, validate_final_review};
