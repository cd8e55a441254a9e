//! Observable workflow state and the progress indicator derived from it

use serde::{Deserialize, Serialize};

use crate::domain::{ClosureStep, EvaluationData, FinalReviewData};
use crate::store::{EvaluationId, ReviewId};

/// How the workflow was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureMode {
    /// Closing an active project from the start
    #[default]
    Fresh,
    /// Completing a postponed method evaluation
    Resume,
}

/// How the workflow ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureOutcome {
    /// Project completed with both retrospectives captured
    Closed,
    /// Project completed, method evaluation outstanding
    Postponed,
    /// Outstanding method evaluation recorded
    EvaluationCompleted,
    /// User backed out of a resumed workflow
    Dismissed,
}

/// Result of a navigation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepChange {
    Moved(ClosureStep),
    Unchanged,
    /// The workflow ended without writing anything
    Dismissed,
}

/// State of one open/close cycle of the closure dialog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClosureState {
    pub current_step: ClosureStep,
    pub final_review_data: Option<FinalReviewData>,
    pub evaluation_data: Option<EvaluationData>,
    /// True while a store call is in flight
    pub is_submitting: bool,
    pub mode: ClosureMode,
    /// Set once the workflow has ended
    pub outcome: Option<ClosureOutcome>,
    /// Final review written by an earlier, partially failed submission
    pub review_id: Option<ReviewId>,
    /// Evaluation written by an earlier, partially failed submission
    pub evaluation_id: Option<EvaluationId>,
}

impl ClosureState {
    /// `{intro, null, null, false}`
    pub fn initial() -> Self {
        Self::default()
    }

    /// Seeded at the method evaluation for a postponed closure
    pub fn resumed() -> Self {
        Self {
            current_step: ClosureStep::MethodEvaluation,
            mode: ClosureMode::Resume,
            ..Self::default()
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// One indicator per step, in order
    pub fn progress(&self) -> Vec<StepIndicator> {
        ClosureStep::ALL
            .iter()
            .map(|&step| StepIndicator {
                step,
                marker: marker_for(step, self.current_step, self.outcome.is_some()),
            })
            .collect()
    }
}

/// Position of a step relative to the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMarker {
    Completed,
    Current,
    Upcoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepIndicator {
    pub step: ClosureStep,
    pub marker: StepMarker,
}

fn marker_for(step: ClosureStep, current: ClosureStep, finished: bool) -> StepMarker {
    if step < current || (finished && step == current) {
        StepMarker::Completed
    } else if step == current {
        StepMarker::Current
    } else {
        StepMarker::Upcoming
    }
}
