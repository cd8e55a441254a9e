//! projclose - closing portfolio projects
//!
//! Retires a project from active status through an explicit state machine,
//! capturing a final review and a method evaluation. The evaluation may be
//! postponed and completed in a later session.

pub mod closure;
pub mod domain;
pub mod error;
pub mod id;
pub mod permissions;
pub mod store;

pub use closure::{ClosureState, ClosureStateMachine};
pub use error::{ClosureError, Result};
