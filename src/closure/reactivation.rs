//! Returning a completed project to active work.
//!
//! This is the only way out of `completed`: the ordinary workflow refuses to
//! reopen a closed project.

use crate::domain::{LifecycleStatus, ProjectClosureUpdate};
use crate::error::{ClosureError, Result};
use crate::store::ClosureStore;

/// Clear the closure stamps of a completed project and put it back in progress.
///
/// Any retrospective already recorded is kept.
pub async fn reactivate_project<S: ClosureStore + ?Sized>(store: &S, project_id: &str) -> Result<()> {
    let current = store
        .fetch_project_closure_state(project_id)
        .await
        .map_err(ClosureError::into_persistence)?;
    if current.lifecycle_status != LifecycleStatus::Completed {
        return Err(ClosureError::IllegalTransition(format!(
            "project {} is {}, only completed projects can be reactivated",
            project_id, current.lifecycle_status
        )));
    }

    store
        .update_project_closure(project_id, &ProjectClosureUpdate::reactivated())
        .await
        .map_err(ClosureError::into_persistence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Project;
    use crate::store::{InMemoryStore, StoreOperation};
    use chrono::Utc;

    fn closed_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let mut project = Project::new("Archive").with_id("p1");
        project.apply_closure(&ProjectClosureUpdate::postponed("alice", Utc::now()));
        store.insert_project(project);
        store
    }

    #[tokio::test]
    async fn test_reactivate_clears_closure_fields() {
        let store = closed_store();
        reactivate_project(&store, "p1").await.unwrap();

        let project = store.project("p1").unwrap();
        assert_eq!(project.lifecycle_status, LifecycleStatus::InProgress);
        assert!(project.closure_status.is_none());
        assert!(project.closed_at.is_none());
        assert!(project.closed_by.is_none());
    }

    #[tokio::test]
    async fn test_reactivate_active_project_is_illegal() {
        let store = InMemoryStore::new();
        store.insert_project(Project::new("Live").with_id("p1"));

        let err = reactivate_project(&store, "p1").await.unwrap_err();
        assert!(matches!(err, ClosureError::IllegalTransition(_)));
    }

    #[tokio::test]
    async fn test_reactivate_unknown_project_is_persistence_error() {
        let store = InMemoryStore::new();
        let err = reactivate_project(&store, "ghost").await.unwrap_err();
        assert!(matches!(err, ClosureError::Persistence(ref m) if m.contains("ghost")));
    }

    #[tokio::test]
    async fn test_reactivate_fetch_failure() {
        let store = closed_store();
        store.fail_on(StoreOperation::FetchProjectClosureState);
        let err = reactivate_project(&store, "p1").await.unwrap_err();
        assert!(err.is_persistence());
    }

    #[tokio::test]
    async fn test_reactivate_store_failure() {
        let store = closed_store();
        store.fail_on(StoreOperation::UpdateProjectClosure);

        let err = reactivate_project(&store, "p1").await.unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(
            store.project("p1").unwrap().lifecycle_status,
            LifecycleStatus::Completed
        );
    }
}
