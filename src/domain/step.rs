//! The ordered steps of the closure workflow

use serde::{Deserialize, Serialize};
use std::fmt;

/// One screen of the closure workflow, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureStep {
    /// Explains what closing the project means
    #[default]
    Intro,
    /// Level-1 retrospective: outcome summary
    FinalReview,
    /// Level-2 retrospective: process feedback, may be deferred
    MethodEvaluation,
    /// Recap before the project is closed
    Confirmation,
}

impl ClosureStep {
    /// All steps in workflow order
    pub const ALL: [ClosureStep; 4] = [
        ClosureStep::Intro,
        ClosureStep::FinalReview,
        ClosureStep::MethodEvaluation,
        ClosureStep::Confirmation,
    ];

    /// Zero-based position in [`ClosureStep::ALL`]
    pub fn index(self) -> usize {
        match self {
            ClosureStep::Intro => 0,
            ClosureStep::FinalReview => 1,
            ClosureStep::MethodEvaluation => 2,
            ClosureStep::Confirmation => 3,
        }
    }

    /// The step after this one, None at confirmation
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// The step before this one, None at intro
    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }
}

impl fmt::Display for ClosureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClosureStep::Intro => "intro",
            ClosureStep::FinalReview => "final_review",
            ClosureStep::MethodEvaluation => "method_evaluation",
            ClosureStep::Confirmation => "confirmation",
        };
        f.write_str(name)
    }
}
