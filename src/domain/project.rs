//! Project record and its closure-related fields

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClosureError;
use crate::id::{generate_project_id, now_ms};

/// Coarse lifecycle of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// Being scoped, not started
    Study,
    /// Actively worked on
    InProgress,
    /// On hold
    Suspended,
    /// Closed through the closure workflow
    Completed,
}

impl LifecycleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleStatus::Study => "study",
            LifecycleStatus::InProgress => "in_progress",
            LifecycleStatus::Suspended => "suspended",
            LifecycleStatus::Completed => "completed",
        }
    }

    /// Returns true if the project is closed
    pub fn is_terminal(self) -> bool {
        self == LifecycleStatus::Completed
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStatus {
    type Err = ClosureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "study" => Ok(LifecycleStatus::Study),
            "in_progress" => Ok(LifecycleStatus::InProgress),
            "suspended" => Ok(LifecycleStatus::Suspended),
            "completed" => Ok(LifecycleStatus::Completed),
            other => Err(ClosureError::Validation(format!(
                "unknown lifecycle status '{}'",
                other
            ))),
        }
    }
}

/// Secondary marker on a completed project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureStatus {
    /// Closed, but the method evaluation was postponed
    PendingEvaluation,
}

/// What the workflow reads before it opens and before it commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectClosureState {
    pub lifecycle_status: LifecycleStatus,
    pub closure_status: Option<ClosureStatus>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
}

impl ProjectClosureState {
    /// Completed with an outstanding method evaluation
    pub fn is_pending_evaluation(&self) -> bool {
        self.lifecycle_status == LifecycleStatus::Completed
            && self.closure_status == Some(ClosureStatus::PendingEvaluation)
    }

    /// Completed with nothing left to capture
    pub fn is_fully_closed(&self) -> bool {
        self.lifecycle_status == LifecycleStatus::Completed && self.closure_status.is_none()
    }
}

/// The closure fields written in one store call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectClosureUpdate {
    pub lifecycle_status: LifecycleStatus,
    pub closure_status: Option<ClosureStatus>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
}

impl ProjectClosureUpdate {
    /// Fully closed by `actor` at `at`
    pub fn closed(actor: &str, at: DateTime<Utc>) -> Self {
        Self {
            lifecycle_status: LifecycleStatus::Completed,
            closure_status: None,
            closed_at: Some(at),
            closed_by: Some(actor.to_string()),
        }
    }

    /// Closed by `actor` at `at`, method evaluation outstanding
    pub fn postponed(actor: &str, at: DateTime<Utc>) -> Self {
        Self {
            closure_status: Some(ClosureStatus::PendingEvaluation),
            ..Self::closed(actor, at)
        }
    }

    /// Evaluation recorded; keeps the original closure stamps
    pub fn evaluation_completed(current: &ProjectClosureState) -> Self {
        Self {
            lifecycle_status: LifecycleStatus::Completed,
            closure_status: None,
            closed_at: current.closed_at,
            closed_by: current.closed_by.clone(),
        }
    }

    /// Back to active work, closure stamps cleared
    pub fn reactivated() -> Self {
        Self {
            lifecycle_status: LifecycleStatus::InProgress,
            closure_status: None,
            closed_at: None,
            closed_by: None,
        }
    }
}

/// A project as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub lifecycle_status: LifecycleStatus,
    #[serde(default)]
    pub closure_status: Option<ClosureStatus>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_by: Option<String>,
    /// Actor managing the project, consulted by permission checks
    #[serde(default)]
    pub manager_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Project {
    /// Create a new in-progress project
    pub fn new(name: &str) -> Self {
        let now = now_ms();
        Self {
            id: generate_project_id(),
            name: name.to_string(),
            lifecycle_status: LifecycleStatus::InProgress,
            closure_status: None,
            closed_at: None,
            closed_by: None,
            manager_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_manager(mut self, manager_id: &str) -> Self {
        self.manager_id = Some(manager_id.to_string());
        self
    }

    pub fn closure_state(&self) -> ProjectClosureState {
        ProjectClosureState {
            lifecycle_status: self.lifecycle_status,
            closure_status: self.closure_status,
            closed_at: self.closed_at,
            closed_by: self.closed_by.clone(),
        }
    }

    /// Copy the closure fields of `update` onto this project
    pub fn apply_closure(&mut self, update: &ProjectClosureUpdate) {
        self.lifecycle_status = update.lifecycle_status;
        self.closure_status = update.closure_status;
        self.closed_at = update.closed_at;
        self.closed_by = update.closed_by.clone();
        self.touch();
    }

    /// Update the timestamp
    pub fn touch(&mut self) {
        self.updated_at = now_ms();
    }
}
