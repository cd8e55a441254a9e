//! In-memory closure store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use super::{ClosureStore, EvaluationId, ReviewId, StoreOperation};
use crate::domain::{
    EvaluationData, EvaluationRecord, FinalReviewData, FinalReviewRecord, Project,
    ProjectClosureState, ProjectClosureUpdate,
};
use crate::error::{ClosureError, Result};
use crate::id::{generate_evaluation_id, generate_review_id};

#[derive(Debug, Default)]
struct Tables {
    projects: HashMap<String, Project>,
    reviews: Vec<FinalReviewRecord>,
    evaluations: Vec<EvaluationRecord>,
    failing: HashSet<StoreOperation>,
    fetch_gate: Option<Arc<Notify>>,
}

/// Store kept entirely in memory.
///
/// Besides acting as a fake backend it can fail the next call of a chosen
/// operation ([`InMemoryStore::fail_on`]) and hold project fetches until
/// released ([`InMemoryStore::hold_fetches`]), which is how a suspended
/// persistence call is simulated.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add or replace a project
    pub fn insert_project(&self, project: Project) {
        self.tables().projects.insert(project.id.clone(), project);
    }

    /// Current copy of a project
    pub fn project(&self, id: &str) -> Option<Project> {
        self.tables().projects.get(id).cloned()
    }

    /// All final reviews written for a project, oldest first
    pub fn final_reviews(&self, project_id: &str) -> Vec<FinalReviewRecord> {
        self.tables()
            .reviews
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect()
    }

    /// All evaluations written for a project, oldest first
    pub fn evaluations(&self, project_id: &str) -> Vec<EvaluationRecord> {
        self.tables()
            .evaluations
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect()
    }

    /// Make the next call of `op` fail with a persistence error
    pub fn fail_on(&self, op: StoreOperation) {
        self.tables().failing.insert(op);
    }

    /// Suspend every `fetch_project_closure_state` call until the returned
    /// gate is notified (one permit per held call)
    pub fn hold_fetches(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.tables().fetch_gate = Some(gate.clone());
        gate
    }

    /// Stop holding fetches; calls already waiting still need a notification
    pub fn release_fetches(&self) {
        self.tables().fetch_gate = None;
    }

    fn check_failure(&self, op: StoreOperation) -> Result<()> {
        if self.tables().failing.remove(&op) {
            return Err(ClosureError::Persistence(format!("{} failed: backend unavailable", op)));
        }
        Ok(())
    }

    fn require_project(tables: &Tables, project_id: &str) -> Result<()> {
        if tables.projects.contains_key(project_id) {
            Ok(())
        } else {
            Err(ClosureError::ProjectNotFound(project_id.to_string()))
        }
    }
}

#[async_trait]
impl ClosureStore for InMemoryStore {
    async fn persist_final_review(&self, project_id: &str, review: &FinalReviewData) -> Result<ReviewId> {
        self.check_failure(StoreOperation::PersistFinalReview)?;
        let mut tables = self.tables();
        Self::require_project(&tables, project_id)?;

        let record = FinalReviewRecord {
            id: generate_review_id(),
            project_id: project_id.to_string(),
            data: review.clone(),
            created_at: Utc::now(),
        };
        let id = record.id.clone();
        tables.reviews.push(record);
        Ok(id)
    }

    async fn persist_evaluation(&self, project_id: &str, evaluation: &EvaluationData) -> Result<EvaluationId> {
        self.check_failure(StoreOperation::PersistEvaluation)?;
        let mut tables = self.tables();
        Self::require_project(&tables, project_id)?;

        let record = EvaluationRecord {
            id: generate_evaluation_id(),
            project_id: project_id.to_string(),
            data: evaluation.clone(),
            created_at: Utc::now(),
        };
        let id = record.id.clone();
        tables.evaluations.push(record);
        Ok(id)
    }

    async fn update_project_closure(&self, project_id: &str, update: &ProjectClosureUpdate) -> Result<()> {
        self.check_failure(StoreOperation::UpdateProjectClosure)?;
        let mut tables = self.tables();
        let project = tables
            .projects
            .get_mut(project_id)
            .ok_or_else(|| ClosureError::ProjectNotFound(project_id.to_string()))?;
        project.apply_closure(update);
        Ok(())
    }

    async fn fetch_project_closure_state(&self, project_id: &str) -> Result<ProjectClosureState> {
        let gate = self.tables().fetch_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_failure(StoreOperation::FetchProjectClosureState)?;
        self.tables()
            .projects
            .get(project_id)
            .map(Project::closure_state)
            .ok_or_else(|| ClosureError::ProjectNotFound(project_id.to_string()))
    }
}
