//! Who may drive the closure workflow.
//!
//! Checked by callers before they expose a mutating operation; the state
//! machine itself never consults it.

use crate::domain::{Actor, ActorRole, Project};

/// Answers whether an actor may invoke a closure operation on a project
pub trait PermissionGate: Send + Sync {
    /// Start, postpone or submit a closure
    fn can_close_project(&self, actor: &Actor, project: &Project) -> bool;

    /// Record a postponed method evaluation
    fn can_complete_evaluation(&self, actor: &Actor, project: &Project) -> bool;

    /// Return a completed project to active work
    fn can_reactivate_project(&self, actor: &Actor, project: &Project) -> bool;
}

/// Role-based gate: portfolio-wide roles may do everything, a project manager
/// may close the projects they manage, nobody else may do anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleGate;

impl RoleGate {
    fn manages(actor: &Actor, project: &Project) -> bool {
        actor.role == ActorRole::ProjectManager && project.manager_id.as_deref() == Some(actor.id.as_str())
    }
}

impl PermissionGate for RoleGate {
    fn can_close_project(&self, actor: &Actor, project: &Project) -> bool {
        actor.role.is_portfolio_wide() || Self::manages(actor, project)
    }

    fn can_complete_evaluation(&self, actor: &Actor, project: &Project) -> bool {
        self.can_close_project(actor, project)
    }

    fn can_reactivate_project(&self, actor: &Actor, _project: &Project) -> bool {
        actor.role.is_portfolio_wide()
    }
}
