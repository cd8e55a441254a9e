//! JSONL-based closure store with in-memory caching.
//!
//! Each collection lives in `<base>/<collection>.jsonl`. Creates append a line,
//! updates rewrite the file from the cache.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};

use super::{ClosureStore, EvaluationId, ReviewId};
use crate::domain::{
    EvaluationData, EvaluationRecord, FinalReviewData, FinalReviewRecord, Project,
    ProjectClosureState, ProjectClosureUpdate,
};
use crate::error::{ClosureError, Result};
use crate::id::{generate_evaluation_id, generate_review_id};

pub const PROJECTS: &str = "projects";
pub const FINAL_REVIEWS: &str = "final_reviews";
pub const EVALUATIONS: &str = "evaluations";

/// JSONL-backed store for projects and their retrospectives.
pub struct JsonlStore {
    base_path: PathBuf,
    cache: RwLock<HashMap<String, Vec<serde_json::Value>>>,
}

impl std::fmt::Debug for JsonlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlStore")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> ClosureError {
    ClosureError::Persistence(e.to_string())
}

fn record_id(record: &serde_json::Value) -> Option<&str> {
    record.get("id").and_then(|v| v.as_str())
}

impl JsonlStore {
    /// Open (creating if needed) a store rooted at `base_path`.
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        log::debug!("Opened JSONL store at {}", base_path.display());
        Ok(Self {
            base_path,
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", collection))
    }

    /// Load a collection into cache if not already loaded.
    fn ensure_loaded(&self, collection: &str) -> Result<()> {
        {
            let cache = self.cache.read().map_err(lock_err)?;
            if cache.contains_key(collection) {
                return Ok(());
            }
        }

        let mut cache = self.cache.write().map_err(lock_err)?;
        if cache.contains_key(collection) {
            return Ok(());
        }

        let path = self.collection_path(collection);
        let mut records = Vec::new();
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                if !line.trim().is_empty() {
                    records.push(serde_json::from_str(&line)?);
                }
            }
        }

        cache.insert(collection.to_string(), records);
        Ok(())
    }

    fn append<T: Serialize>(&self, collection: &str, record: &T) -> Result<()> {
        self.ensure_loaded(collection)?;
        let value = serde_json::to_value(record)?;

        let path = self.collection_path(collection);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", serde_json::to_string(&value)?)?;

        self.cache
            .write()
            .map_err(lock_err)?
            .entry(collection.to_string())
            .or_default()
            .push(value);
        Ok(())
    }

    fn rewrite(&self, collection: &str, records: &[serde_json::Value]) -> Result<()> {
        let path = self.collection_path(collection);
        let tmp = path.with_extension("jsonl.tmp");
        {
            let mut file = File::create(&tmp)?;
            for record in records {
                writeln!(file, "{}", serde_json::to_string(record)?)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn find<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        self.ensure_loaded(collection)?;
        let cache = self.cache.read().map_err(lock_err)?;
        cache
            .get(collection)
            .and_then(|records| records.iter().find(|r| record_id(r) == Some(id)))
            .map(|r| serde_json::from_value(r.clone()).map_err(ClosureError::from))
            .transpose()
    }

    fn all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        self.ensure_loaded(collection)?;
        let cache = self.cache.read().map_err(lock_err)?;
        cache
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .map(|r| serde_json::from_value(r.clone()).map_err(ClosureError::from))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// Add a new project
    pub fn create_project(&self, project: &Project) -> Result<()> {
        if self.find::<Project>(PROJECTS, &project.id)?.is_some() {
            return Err(ClosureError::Persistence(format!(
                "project {} already exists",
                project.id
            )));
        }
        self.append(PROJECTS, project)?;
        log::info!("Created project {} ({})", project.id, project.name);
        Ok(())
    }

    /// Get a project by ID.
    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.find(PROJECTS, id)
    }

    /// Get a project by ID, failing when it does not exist.
    pub fn require_project(&self, id: &str) -> Result<Project> {
        self.get_project(id)?
            .ok_or_else(|| ClosureError::ProjectNotFound(id.to_string()))
    }

    /// List all projects.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.all(PROJECTS)
    }

    /// Final reviews recorded for a project, oldest first
    pub fn final_reviews(&self, project_id: &str) -> Result<Vec<FinalReviewRecord>> {
        let all: Vec<FinalReviewRecord> = self.all(FINAL_REVIEWS)?;
        Ok(all.into_iter().filter(|r| r.project_id == project_id).collect())
    }

    /// Evaluations recorded for a project, oldest first
    pub fn evaluations(&self, project_id: &str) -> Result<Vec<EvaluationRecord>> {
        let all: Vec<EvaluationRecord> = self.all(EVALUATIONS)?;
        Ok(all.into_iter().filter(|r| r.project_id == project_id).collect())
    }

    /// Apply a closure update to the cached project and rewrite the file.
    fn write_closure(&self, project_id: &str, update: &ProjectClosureUpdate) -> Result<()> {
        self.ensure_loaded(PROJECTS)?;

        let mut cache = self.cache.write().map_err(lock_err)?;
        let records = cache.entry(PROJECTS.to_string()).or_default();
        let slot = records
            .iter_mut()
            .find(|r| record_id(r) == Some(project_id))
            .ok_or_else(|| ClosureError::ProjectNotFound(project_id.to_string()))?;

        let mut project: Project = serde_json::from_value(slot.clone())?;
        project.apply_closure(update);
        let previous = std::mem::replace(slot, serde_json::to_value(&project)?);

        if let Err(e) = self.rewrite(PROJECTS, records) {
            // Keep the cache consistent with what is on disk
            if let Some(slot) = records.iter_mut().find(|r| record_id(r) == Some(project_id)) {
                *slot = previous;
            }
            log::warn!("Failed to rewrite {}: {}", PROJECTS, e);
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl ClosureStore for JsonlStore {
    async fn persist_final_review(&self, project_id: &str, review: &FinalReviewData) -> Result<ReviewId> {
        self.require_project(project_id)?;
        let record = FinalReviewRecord {
            id: generate_review_id(),
            project_id: project_id.to_string(),
            data: review.clone(),
            created_at: Utc::now(),
        };
        self.append(FINAL_REVIEWS, &record)?;
        log::debug!("Persisted final review {} for {}", record.id, project_id);
        Ok(record.id)
    }

    async fn persist_evaluation(&self, project_id: &str, evaluation: &EvaluationData) -> Result<EvaluationId> {
        self.require_project(project_id)?;
        let record = EvaluationRecord {
            id: generate_evaluation_id(),
            project_id: project_id.to_string(),
            data: evaluation.clone(),
            created_at: Utc::now(),
        };
        self.append(EVALUATIONS, &record)?;
        log::debug!("Persisted evaluation {} for {}", record.id, project_id);
        Ok(record.id)
    }

    async fn update_project_closure(&self, project_id: &str, update: &ProjectClosureUpdate) -> Result<()> {
        self.write_closure(project_id, update)?;
        log::debug!(
            "Updated closure of {}: lifecycle={} closure_status={:?}",
            project_id,
            update.lifecycle_status,
            update.closure_status
        );
        Ok(())
    }

    async fn fetch_project_closure_state(&self, project_id: &str) -> Result<ProjectClosureState> {
        Ok(self.require_project(project_id)?.closure_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClosureStatus, LifecycleStatus, Progress, Weather};
    use tempfile::TempDir;

    fn create_test_store() -> (JsonlStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlStore::open(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    fn review() -> FinalReviewData {
        FinalReviewData {
            weather: Weather::Sunny,
            progress: Progress::Better,
            completion: 95,
            comment: Some("Delivered ahead of the audit".to_string()),
            difficulties: None,
        }
    }

    #[test]
    fn test_create_and_get_project() {
        let (store, _temp) = create_test_store();
        let project = Project::new("Billing revamp");
        store.create_project(&project).unwrap();

        let retrieved = store.get_project(&project.id).unwrap();
        assert_eq!(retrieved, Some(project));
    }

    #[test]
    fn test_get_project_not_found() {
        let (store, _temp) = create_test_store();
        assert_eq!(store.get_project("missing").unwrap(), None);
        assert!(matches!(
            store.require_project("missing"),
            Err(ClosureError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn test_create_duplicate_project() {
        let (store, _temp) = create_test_store();
        let project = Project::new("Billing revamp");
        store.create_project(&project).unwrap();
        assert!(store.create_project(&project).is_err());
    }

    #[test]
    fn test_list_projects() {
        let (store, _temp) = create_test_store();
        store.create_project(&Project::new("One")).unwrap();
        store.create_project(&Project::new("Two")).unwrap();
        assert_eq!(store.list_projects().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_persist_final_review_for_unknown_project() {
        let (store, _temp) = create_test_store();
        let result = store.persist_final_review("missing", &review()).await;
        assert!(matches!(result, Err(ClosureError::ProjectNotFound(_))));
    }

    #[tokio::test]
    async fn test_closure_update_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::new("Data lake");

        {
            let store = JsonlStore::open(temp_dir.path()).unwrap();
            store.create_project(&project).unwrap();
            store.persist_final_review(&project.id, &review()).await.unwrap();
            store
                .update_project_closure(&project.id, &ProjectClosureUpdate::postponed("dave", Utc::now()))
                .await
                .unwrap();
        }

        {
            let store = JsonlStore::open(temp_dir.path()).unwrap();
            let state = store.fetch_project_closure_state(&project.id).await.unwrap();
            assert_eq!(state.lifecycle_status, LifecycleStatus::Completed);
            assert_eq!(state.closure_status, Some(ClosureStatus::PendingEvaluation));

            let reloaded = store.require_project(&project.id).unwrap();
            assert_eq!(reloaded.closed_by.as_deref(), Some("dave"));

            let reviews = store.final_reviews(&project.id).unwrap();
            assert_eq!(reviews.len(), 1);
            assert_eq!(reviews[0].data, review());
            assert!(store.evaluations(&project.id).unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_records_are_scoped_to_project() {
        let (store, _temp) = create_test_store();
        let a = Project::new("A");
        let b = Project::new("B");
        store.create_project(&a).unwrap();
        store.create_project(&b).unwrap();

        store.persist_evaluation(&a.id, &EvaluationData::default()).await.unwrap();

        assert_eq!(store.evaluations(&a.id).unwrap().len(), 1);
        assert!(store.evaluations(&b.id).unwrap().is_empty());
    }
}
