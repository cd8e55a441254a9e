//! The closure state machine.
//!
//! Owns one [`ClosureState`] per open workflow and is the only component that
//! writes closure fields through a [`ClosureStore`]. Navigation and data entry
//! are synchronous; `postpone_evaluation`, `submit_closure` and
//! `complete_evaluation` are the only suspension points.
//!
//! Every synchronous transition is computed on a copy of the state and
//! committed only on success, so a rejected call leaves the state untouched.
//! Terminal calls flip `is_submitting` before their first await and clear it
//! when they resolve; a second terminal call made in between is rejected with
//! [`ClosureError::SubmissionInProgress`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::state::{ClosureMode, ClosureOutcome, ClosureState, StepChange, StepIndicator};
use super::validation::{validate_evaluation, validate_final_review};
use crate::domain::{
    Actor, ClosureStep, EvaluationData, FinalReviewInput, ProjectClosureState, ProjectClosureUpdate,
};
use crate::error::{ClosureError, Result};
use crate::store::{ClosureStore, EvaluationId, ReviewId};

fn illegal(message: impl Into<String>) -> ClosureError {
    ClosureError::IllegalTransition(message.into())
}

/// An evaluation persisted by a failed attempt may be resubmitted but not edited
fn ensure_unrecorded_evaluation(state: &ClosureState, data: &EvaluationData) -> Result<()> {
    if state.evaluation_id.is_some() && state.evaluation_data.as_ref() != Some(data) {
        return Err(illegal(
            "the evaluation was already recorded by an earlier attempt and can no longer change",
        ));
    }
    Ok(())
}

/// What a successful terminal transition wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureReceipt {
    pub project_id: String,
    pub outcome: ClosureOutcome,
    pub actor_id: String,
    pub review_id: Option<ReviewId>,
    pub evaluation_id: Option<EvaluationId>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Drives the closure workflow of a single project
pub struct ClosureStateMachine<S: ClosureStore + ?Sized> {
    store: Arc<S>,
    project_id: String,
    state: watch::Sender<ClosureState>,
}

impl<S: ClosureStore + ?Sized> std::fmt::Debug for ClosureStateMachine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureStateMachine")
            .field("project_id", &self.project_id)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl<S: ClosureStore + ?Sized> ClosureStateMachine<S> {
    fn with_state(store: Arc<S>, project_id: &str, initial: ClosureState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            store,
            project_id: project_id.to_string(),
            state,
        }
    }

    /// Workflow for an active project, starting at the intro
    pub fn new(store: Arc<S>, project_id: &str) -> Self {
        Self::with_state(store, project_id, ClosureState::initial())
    }

    /// Workflow for a project whose method evaluation was postponed,
    /// starting at the method evaluation
    pub fn resume(store: Arc<S>, project_id: &str) -> Self {
        Self::with_state(store, project_id, ClosureState::resumed())
    }

    /// Open the workflow in the mode the project's current state calls for.
    ///
    /// A fully closed project is refused: only reactivation may bring it back.
    pub async fn open(store: Arc<S>, project_id: &str) -> Result<Self> {
        let current = store.fetch_project_closure_state(project_id).await?;
        if current.is_pending_evaluation() {
            Ok(Self::resume(store, project_id))
        } else if current.is_fully_closed() {
            Err(illegal(format!(
                "project {} is already closed; reactivate it before closing again",
                project_id
            )))
        } else {
            Ok(Self::new(store, project_id))
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ClosureState {
        self.state.borrow().clone()
    }

    pub fn current_step(&self) -> ClosureStep {
        self.state.borrow().current_step
    }

    pub fn is_submitting(&self) -> bool {
        self.state.borrow().is_submitting
    }

    pub fn mode(&self) -> ClosureMode {
        self.state.borrow().mode
    }

    /// The ordered step list
    pub fn steps(&self) -> &'static [ClosureStep] {
        &ClosureStep::ALL
    }

    /// Completed/current/upcoming marker for every step
    pub fn progress(&self) -> Vec<StepIndicator> {
        self.state.borrow().progress()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<ClosureState> {
        self.state.subscribe()
    }

    /// Apply `f` to a copy of the state, committing only if it succeeds.
    fn transition<T>(&self, f: impl FnOnce(&mut ClosureState) -> Result<T>) -> Result<T> {
        let mut result = Err(illegal("transition did not run"));
        self.state.send_if_modified(|state| {
            if state.is_finished() {
                result = Err(illegal("the closure workflow has already ended"));
                return false;
            }
            if state.is_submitting {
                result = Err(ClosureError::SubmissionInProgress);
                return false;
            }

            let mut next = state.clone();
            match f(&mut next) {
                Ok(value) => {
                    result = Ok(value);
                    let changed = next != *state;
                    *state = next;
                    changed
                }
                Err(e) => {
                    result = Err(e);
                    false
                }
            }
        });
        result
    }

    //=== Navigation ===

    /// Advance one step. No-op at confirmation, and before confirmation
    /// while no final review has been saved.
    pub fn go_to_next_step(&self) -> Result<StepChange> {
        self.transition(|state| {
            let Some(next) = state.current_step.next() else {
                return Ok(StepChange::Unchanged);
            };
            if next == ClosureStep::Confirmation && state.final_review_data.is_none() {
                return Ok(StepChange::Unchanged);
            }
            state.current_step = next;
            Ok(StepChange::Moved(next))
        })
    }

    /// Go back one step, keeping entered data. In resume mode going back from
    /// the method evaluation ends the workflow instead of exposing the
    /// already persisted final review.
    pub fn go_to_previous_step(&self) -> Result<StepChange> {
        self.transition(|state| {
            if state.mode == ClosureMode::Resume && state.current_step <= ClosureStep::MethodEvaluation {
                state.outcome = Some(ClosureOutcome::Dismissed);
                return Ok(StepChange::Dismissed);
            }
            match state.current_step.previous() {
                Some(previous) => {
                    state.current_step = previous;
                    Ok(StepChange::Moved(previous))
                }
                None => Ok(StepChange::Unchanged),
            }
        })
    }

    /// Jump directly to `target`
    pub fn go_to_step(&self, target: ClosureStep) -> Result<()> {
        self.transition(|state| {
            if state.mode == ClosureMode::Resume && target < ClosureStep::MethodEvaluation {
                return Err(illegal(format!(
                    "{} is not available while completing a postponed evaluation",
                    target
                )));
            }
            if target == ClosureStep::Confirmation && state.final_review_data.is_none() {
                return Err(illegal("confirmation requires a saved final review"));
            }
            state.current_step = target;
            Ok(())
        })
    }

    //=== Data entry ===

    /// Validate and store the final review, then move to the method evaluation
    pub fn save_final_review_data(&self, input: &FinalReviewInput) -> Result<()> {
        self.transition(|state| {
            if state.mode == ClosureMode::Resume {
                return Err(illegal("the final review of a postponed closure cannot be edited"));
            }
            if state.current_step != ClosureStep::FinalReview {
                return Err(illegal(format!(
                    "final review can only be saved at final_review (currently {})",
                    state.current_step
                )));
            }
            let data = validate_final_review(input)?;
            if state.review_id.is_some() && state.final_review_data.as_ref() != Some(&data) {
                return Err(illegal(
                    "the final review was already recorded by an earlier attempt and can no longer change",
                ));
            }
            state.final_review_data = Some(data);
            state.current_step = ClosureStep::MethodEvaluation;
            Ok(())
        })
    }

    /// Store the method evaluation, then move to the confirmation
    pub fn save_evaluation_data(&self, data: &EvaluationData) -> Result<()> {
        self.transition(|state| {
            if state.mode == ClosureMode::Resume {
                return Err(illegal(
                    "a postponed evaluation is recorded with complete_evaluation",
                ));
            }
            if state.current_step != ClosureStep::MethodEvaluation {
                return Err(illegal(format!(
                    "evaluation can only be saved at method_evaluation (currently {})",
                    state.current_step
                )));
            }
            if state.final_review_data.is_none() {
                return Err(illegal("confirmation requires a saved final review"));
            }
            let data = validate_evaluation(data);
            ensure_unrecorded_evaluation(state, &data)?;
            state.evaluation_data = Some(data);
            state.current_step = ClosureStep::Confirmation;
            Ok(())
        })
    }

    /// Back to `{intro, null, null, false}` in fresh mode.
    ///
    /// Refused while a terminal call is in flight.
    pub fn reset_closure(&self) -> Result<()> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            if state.is_submitting {
                result = Err(ClosureError::SubmissionInProgress);
                return false;
            }
            let initial = ClosureState::initial();
            let changed = *state != initial;
            *state = initial;
            changed
        });
        result
    }

    //=== Terminal transitions ===

    /// Close the project now and defer the method evaluation.
    pub async fn postpone_evaluation(&self, actor: &Actor) -> Result<ClosureReceipt> {
        let snapshot = self.begin_submission(|state| {
            if state.mode == ClosureMode::Resume {
                return Err(illegal("the evaluation of this project is already postponed"));
            }
            if !matches!(
                state.current_step,
                ClosureStep::FinalReview | ClosureStep::MethodEvaluation
            ) {
                return Err(illegal(format!(
                    "evaluation can only be postponed from final_review or method_evaluation (currently {})",
                    state.current_step
                )));
            }
            if state.final_review_data.is_none() {
                return Err(illegal("a final review is required before postponing the evaluation"));
            }
            if state.evaluation_id.is_some() {
                return Err(illegal(
                    "an evaluation was already recorded for this closure; submit it instead of postponing",
                ));
            }
            Ok(())
        })?;

        let result = self.write_postponed(&snapshot, actor).await;
        self.finish_submission(result)
    }

    /// Close the project with both retrospectives.
    pub async fn submit_closure(&self, actor: &Actor) -> Result<ClosureReceipt> {
        let snapshot = self.begin_submission(|state| {
            if state.mode == ClosureMode::Resume {
                return Err(illegal(
                    "a postponed closure is finished with complete_evaluation",
                ));
            }
            if state.current_step != ClosureStep::Confirmation {
                return Err(illegal(format!(
                    "closure can only be submitted at confirmation (currently {})",
                    state.current_step
                )));
            }
            if state.final_review_data.is_none() {
                return Err(illegal("a final review is required to close the project"));
            }
            Ok(())
        })?;

        let result = self.write_closed(&snapshot, actor).await;
        self.finish_submission(result)
    }

    /// Record a postponed method evaluation. The final review and the
    /// original closure stamps are left as they are.
    pub async fn complete_evaluation(&self, actor: &Actor, data: &EvaluationData) -> Result<ClosureReceipt> {
        let data = validate_evaluation(data);
        let snapshot = self.begin_submission(|state| {
            if state.mode != ClosureMode::Resume {
                return Err(illegal(
                    "complete_evaluation is only available for a postponed closure",
                ));
            }
            if state.current_step != ClosureStep::MethodEvaluation {
                return Err(illegal(format!(
                    "evaluation can only be completed at method_evaluation (currently {})",
                    state.current_step
                )));
            }
            ensure_unrecorded_evaluation(state, &data)?;
            state.evaluation_data = Some(data);
            Ok(())
        })?;

        let result = self.write_evaluation_completed(&snapshot, actor).await;
        self.finish_submission(result)
    }

    /// Check preconditions, mark the state as submitting and hand back the
    /// data to write.
    fn begin_submission(
        &self,
        check: impl FnOnce(&mut ClosureState) -> Result<()>,
    ) -> Result<ClosureState> {
        self.transition(|state| {
            check(state)?;
            state.is_submitting = true;
            Ok(state.clone())
        })
    }

    fn finish_submission(&self, result: Result<ClosureReceipt>) -> Result<ClosureReceipt> {
        let result = result.map_err(ClosureError::into_persistence);
        self.state.send_modify(|state| {
            state.is_submitting = false;
            if let Ok(receipt) = &result {
                state.outcome = Some(receipt.outcome);
            }
        });
        result
    }

    async fn fetch_current(&self) -> Result<ProjectClosureState> {
        self.store.fetch_project_closure_state(&self.project_id).await
    }

    /// Re-read the project and make sure nobody closed it in the meantime.
    /// Runs before the record writes and again right before the status write.
    async fn ensure_still_open(&self) -> Result<()> {
        let current = self.fetch_current().await?;
        if current.lifecycle_status.is_terminal() {
            return Err(ClosureError::StaleProject {
                project_id: self.project_id.clone(),
                expected: "not completed".to_string(),
                found: current.lifecycle_status,
            });
        }
        Ok(())
    }

    /// Re-read the project and make sure it still awaits its evaluation
    async fn ensure_still_pending(&self) -> Result<ProjectClosureState> {
        let current = self.fetch_current().await?;
        if !current.is_pending_evaluation() {
            return Err(ClosureError::StaleProject {
                project_id: self.project_id.clone(),
                expected: "completed with a pending evaluation".to_string(),
                found: current.lifecycle_status,
            });
        }
        Ok(current)
    }

    /// Write the final review unless an earlier attempt already did
    async fn persist_review_once(&self, snapshot: &ClosureState) -> Result<ReviewId> {
        if let Some(id) = &snapshot.review_id {
            return Ok(id.clone());
        }
        let review = snapshot
            .final_review_data
            .as_ref()
            .ok_or_else(|| illegal("no final review to persist"))?;

        let id = self.store.persist_final_review(&self.project_id, review).await?;
        self.state.send_modify(|state| state.review_id = Some(id.clone()));
        Ok(id)
    }

    /// Write the evaluation, if any, unless an earlier attempt already did
    async fn persist_evaluation_once(&self, snapshot: &ClosureState) -> Result<Option<EvaluationId>> {
        if let Some(id) = &snapshot.evaluation_id {
            return Ok(Some(id.clone()));
        }
        let Some(evaluation) = &snapshot.evaluation_data else {
            return Ok(None);
        };

        let id = self.store.persist_evaluation(&self.project_id, evaluation).await?;
        self.state.send_modify(|state| state.evaluation_id = Some(id.clone()));
        Ok(Some(id))
    }

    async fn write_postponed(&self, snapshot: &ClosureState, actor: &Actor) -> Result<ClosureReceipt> {
        self.ensure_still_open().await?;
        let review_id = self.persist_review_once(snapshot).await?;

        self.ensure_still_open().await?;
        let closed_at = Utc::now();
        self.store
            .update_project_closure(&self.project_id, &ProjectClosureUpdate::postponed(&actor.id, closed_at))
            .await?;

        Ok(ClosureReceipt {
            project_id: self.project_id.clone(),
            outcome: ClosureOutcome::Postponed,
            actor_id: actor.id.clone(),
            review_id: Some(review_id),
            evaluation_id: None,
            closed_at: Some(closed_at),
        })
    }

    async fn write_closed(&self, snapshot: &ClosureState, actor: &Actor) -> Result<ClosureReceipt> {
        self.ensure_still_open().await?;
        let review_id = self.persist_review_once(snapshot).await?;
        let evaluation_id = self.persist_evaluation_once(snapshot).await?;

        self.ensure_still_open().await?;
        let closed_at = Utc::now();
        self.store
            .update_project_closure(&self.project_id, &ProjectClosureUpdate::closed(&actor.id, closed_at))
            .await?;

        Ok(ClosureReceipt {
            project_id: self.project_id.clone(),
            outcome: ClosureOutcome::Closed,
            actor_id: actor.id.clone(),
            review_id: Some(review_id),
            evaluation_id,
            closed_at: Some(closed_at),
        })
    }

    async fn write_evaluation_completed(
        &self,
        snapshot: &ClosureState,
        actor: &Actor,
    ) -> Result<ClosureReceipt> {
        self.ensure_still_pending().await?;
        let evaluation_id = self.persist_evaluation_once(snapshot).await?;

        let current = self.ensure_still_pending().await?;
        let update = ProjectClosureUpdate::evaluation_completed(&current);
        self.store.update_project_closure(&self.project_id, &update).await?;

        Ok(ClosureReceipt {
            project_id: self.project_id.clone(),
            outcome: ClosureOutcome::EvaluationCompleted,
            actor_id: actor.id.clone(),
            review_id: None,
            evaluation_id,
            closed_at: current.closed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActorRole, LifecycleStatus, Project};
    use crate::store::{InMemoryStore, StoreOperation};

    fn actor() -> Actor {
        Actor::new("alice", ActorRole::ProjectManager)
    }

    fn setup() -> (Arc<InMemoryStore>, ClosureStateMachine<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        store.insert_project(Project::new("Portal").with_id("p1"));
        let machine = ClosureStateMachine::new(store.clone(), "p1");
        (store, machine)
    }

    fn review() -> FinalReviewInput {
        FinalReviewInput::new("cloudy", "stable", 80.0)
    }

    fn at_method_evaluation(machine: &ClosureStateMachine<InMemoryStore>) {
        machine.go_to_next_step().unwrap();
        machine.save_final_review_data(&review()).unwrap();
    }

    fn at_confirmation(machine: &ClosureStateMachine<InMemoryStore>) {
        at_method_evaluation(machine);
        machine.save_evaluation_data(&EvaluationData::default()).unwrap();
    }

    #[test]
    fn test_new_machine_starts_at_intro() {
        let (_store, machine) = setup();
        assert_eq!(machine.snapshot(), ClosureState::initial());
        assert_eq!(machine.steps().len(), 4);
        assert_eq!(machine.project_id(), "p1");
    }

    #[test]
    fn test_next_is_noop_at_confirmation() {
        let (_store, machine) = setup();
        at_confirmation(&machine);
        assert_eq!(machine.go_to_next_step().unwrap(), StepChange::Unchanged);
        assert_eq!(machine.current_step(), ClosureStep::Confirmation);
    }

    #[test]
    fn test_previous_is_noop_at_intro() {
        let (_store, machine) = setup();
        assert_eq!(machine.go_to_previous_step().unwrap(), StepChange::Unchanged);
        assert_eq!(machine.current_step(), ClosureStep::Intro);
    }

    #[test]
    fn test_next_does_not_reach_confirmation_without_review() {
        let (_store, machine) = setup();
        machine.go_to_next_step().unwrap();
        machine.go_to_next_step().unwrap();
        assert_eq!(machine.current_step(), ClosureStep::MethodEvaluation);
        assert_eq!(machine.go_to_next_step().unwrap(), StepChange::Unchanged);
        assert_eq!(machine.current_step(), ClosureStep::MethodEvaluation);
    }

    #[test]
    fn test_go_to_step_guards_confirmation() {
        let (_store, machine) = setup();
        let err = machine.go_to_step(ClosureStep::Confirmation).unwrap_err();
        assert!(matches!(err, ClosureError::IllegalTransition(_)));
        assert_eq!(machine.current_step(), ClosureStep::Intro);

        machine.go_to_step(ClosureStep::MethodEvaluation).unwrap();
        assert_eq!(machine.current_step(), ClosureStep::MethodEvaluation);
    }

    #[test]
    fn test_save_final_review_requires_step() {
        let (_store, machine) = setup();
        let err = machine.save_final_review_data(&review()).unwrap_err();
        assert!(matches!(err, ClosureError::IllegalTransition(_)));
        assert!(machine.snapshot().final_review_data.is_none());
    }

    #[test]
    fn test_save_evaluation_requires_review() {
        let (_store, machine) = setup();
        machine.go_to_step(ClosureStep::MethodEvaluation).unwrap();
        let err = machine.save_evaluation_data(&EvaluationData::default()).unwrap_err();
        assert!(matches!(err, ClosureError::IllegalTransition(_)));
        assert_eq!(machine.current_step(), ClosureStep::MethodEvaluation);
    }

    #[test]
    fn test_previous_keeps_entered_data() {
        let (_store, machine) = setup();
        at_confirmation(&machine);
        machine.go_to_previous_step().unwrap();
        machine.go_to_previous_step().unwrap();

        let state = machine.snapshot();
        assert_eq!(state.current_step, ClosureStep::FinalReview);
        assert!(state.final_review_data.is_some());
        assert_eq!(state.evaluation_data, Some(EvaluationData::default()));
    }

    #[test]
    fn test_reset_closure() {
        let (_store, machine) = setup();
        at_confirmation(&machine);
        machine.reset_closure().unwrap();
        assert_eq!(machine.snapshot(), ClosureState::initial());
    }

    #[test]
    fn test_subscribe_sees_transitions() {
        let (_store, machine) = setup();
        let mut rx = machine.subscribe();
        machine.go_to_next_step().unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().current_step, ClosureStep::FinalReview);

        // No-op transitions do not notify
        machine.go_to_step(ClosureStep::FinalReview).unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_postpone_at_confirmation_is_illegal() {
        let (store, machine) = setup();
        at_confirmation(&machine);
        let err = machine.postpone_evaluation(&actor()).await.unwrap_err();
        assert!(matches!(err, ClosureError::IllegalTransition(_)));
        assert!(!machine.is_submitting());
        assert_eq!(store.project("p1").unwrap().lifecycle_status, LifecycleStatus::InProgress);
    }

    #[tokio::test]
    async fn test_submit_records_receipt_and_outcome() {
        let (store, machine) = setup();
        at_confirmation(&machine);

        let receipt = machine.submit_closure(&actor()).await.unwrap();
        assert_eq!(receipt.outcome, ClosureOutcome::Closed);
        assert_eq!(receipt.actor_id, "alice");
        assert!(receipt.evaluation_id.is_some());

        let state = machine.snapshot();
        assert_eq!(state.outcome, Some(ClosureOutcome::Closed));
        assert!(!state.is_submitting);

        let project = store.project("p1").unwrap();
        assert_eq!(project.closed_by.as_deref(), Some("alice"));
        assert_eq!(project.closed_at, receipt.closed_at);
    }

    #[tokio::test]
    async fn test_operations_rejected_after_workflow_ends() {
        let (_store, machine) = setup();
        at_confirmation(&machine);
        machine.submit_closure(&actor()).await.unwrap();

        assert!(matches!(
            machine.go_to_previous_step(),
            Err(ClosureError::IllegalTransition(_))
        ));
        assert!(matches!(
            machine.submit_closure(&actor()).await,
            Err(ClosureError::IllegalTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_review_for_retry() {
        let (store, machine) = setup();
        at_confirmation(&machine);
        store.fail_on(StoreOperation::UpdateProjectClosure);

        let err = machine.submit_closure(&actor()).await.unwrap_err();
        assert!(err.is_persistence());

        let state = machine.snapshot();
        assert!(!state.is_submitting);
        assert_eq!(state.current_step, ClosureStep::Confirmation);
        assert!(state.final_review_data.is_some());
        assert!(state.review_id.is_some());
        assert!(state.outcome.is_none());

        machine.submit_closure(&actor()).await.unwrap();
        assert_eq!(store.final_reviews("p1").len(), 1);
        assert_eq!(store.evaluations("p1").len(), 1);
    }

    #[tokio::test]
    async fn test_recorded_data_cannot_be_edited_before_retry() {
        let (store, machine) = setup();
        at_confirmation(&machine);
        store.fail_on(StoreOperation::UpdateProjectClosure);
        machine.submit_closure(&actor()).await.unwrap_err();

        machine.go_to_previous_step().unwrap();
        let edited = EvaluationData {
            improvements: Some("Smaller batches".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            machine.save_evaluation_data(&edited),
            Err(ClosureError::IllegalTransition(_))
        ));

        machine.go_to_previous_step().unwrap();
        let err = machine
            .save_final_review_data(&FinalReviewInput::new("stormy", "worse", 20.0))
            .unwrap_err();
        assert!(matches!(err, ClosureError::IllegalTransition(_)));

        // Re-saving what was recorded is fine
        machine.save_final_review_data(&review()).unwrap();
        machine.save_evaluation_data(&EvaluationData::default()).unwrap();
        machine.submit_closure(&actor()).await.unwrap();
        assert_eq!(store.final_reviews("p1").len(), 1);
        assert_eq!(store.evaluations("p1").len(), 1);
    }

    #[tokio::test]
    async fn test_store_not_found_surfaces_as_persistence() {
        let store = Arc::new(InMemoryStore::new());
        let machine = ClosureStateMachine::new(store, "ghost");
        machine.go_to_next_step().unwrap();
        machine.save_final_review_data(&review()).unwrap();

        let err = machine.postpone_evaluation(&actor()).await.unwrap_err();
        assert!(matches!(err, ClosureError::Persistence(ref m) if m.contains("ghost")));
    }

    #[tokio::test]
    async fn test_open_refuses_closed_project() {
        let store = Arc::new(InMemoryStore::new());
        let mut project = Project::new("Done").with_id("p1");
        project.apply_closure(&ProjectClosureUpdate::closed("alice", Utc::now()));
        store.insert_project(project);

        let err = ClosureStateMachine::open(store, "p1").await.unwrap_err();
        assert!(matches!(err, ClosureError::IllegalTransition(_)));
    }

    #[tokio::test]
    async fn test_open_picks_mode() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_project(Project::new("Active").with_id("active"));
        let mut pending = Project::new("Pending").with_id("pending");
        pending.apply_closure(&ProjectClosureUpdate::postponed("alice", Utc::now()));
        store.insert_project(pending);

        let fresh = ClosureStateMachine::open(store.clone(), "active").await.unwrap();
        assert_eq!(fresh.mode(), ClosureMode::Fresh);
        assert_eq!(fresh.current_step(), ClosureStep::Intro);

        let resumed = ClosureStateMachine::open(store, "pending").await.unwrap();
        assert_eq!(resumed.mode(), ClosureMode::Resume);
        assert_eq!(resumed.current_step(), ClosureStep::MethodEvaluation);
    }

    #[test]
    fn test_resume_mode_blocks_final_review() {
        let store = Arc::new(InMemoryStore::new());
        let machine = ClosureStateMachine::resume(store, "p1");

        assert!(matches!(
            machine.go_to_step(ClosureStep::FinalReview),
            Err(ClosureError::IllegalTransition(_))
        ));
        assert!(matches!(
            machine.save_evaluation_data(&EvaluationData::default()),
            Err(ClosureError::IllegalTransition(_))
        ));
        assert_eq!(machine.current_step(), ClosureStep::MethodEvaluation);
    }

    #[tokio::test]
    async fn test_submit_in_resume_mode_is_illegal() {
        let store = Arc::new(InMemoryStore::new());
        let machine = ClosureStateMachine::resume(store, "p1");
        let err = machine.submit_closure(&actor()).await.unwrap_err();
        assert!(matches!(err, ClosureError::IllegalTransition(_)));
    }

    #[tokio::test]
    async fn test_complete_evaluation_in_fresh_mode_is_illegal() {
        let (_store, machine) = setup();
        machine.go_to_step(ClosureStep::MethodEvaluation).unwrap();
        let err = machine
            .complete_evaluation(&actor(), &EvaluationData::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClosureError::IllegalTransition(_)));
        assert!(machine.snapshot().evaluation_data.is_none());
    }
}
