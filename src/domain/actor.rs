//! The authenticated user driving a workflow

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClosureError;

/// Organisational role of an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    PortfolioManager,
    ProjectManager,
    #[default]
    Contributor,
    Viewer,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::PortfolioManager => "portfolio_manager",
            ActorRole::ProjectManager => "project_manager",
            ActorRole::Contributor => "contributor",
            ActorRole::Viewer => "viewer",
        }
    }

    /// Roles with authority over every project
    pub fn is_portfolio_wide(self) -> bool {
        matches!(self, ActorRole::Admin | ActorRole::PortfolioManager)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = ClosureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ActorRole::Admin),
            "portfolio_manager" => Ok(ActorRole::PortfolioManager),
            "project_manager" => Ok(ActorRole::ProjectManager),
            "contributor" => Ok(ActorRole::Contributor),
            "viewer" => Ok(ActorRole::Viewer),
            other => Err(ClosureError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

/// Who is performing an operation; stamped into `closed_by`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: &str, role: ActorRole) -> Self {
        Self {
            id: id.to_string(),
            role,
        }
    }
}
