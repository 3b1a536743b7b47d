use chrono::DateTime;
use chrono::Utc;
use outreach_protocol::ExecutionState;
use outreach_protocol::OutcomeType;
use outreach_protocol::RunStatus;
use serde::Serialize;

/// Facts consumers derive from a snapshot, computed in one place.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExecutionSummary {
    pub has_run: bool,
    pub is_active: bool,
    pub is_terminal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeType>,
    /// Share of contacts with an email address; `None` when there are no contacts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_coverage: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

impl ExecutionSummary {
    pub fn from_state(state: &ExecutionState) -> Self {
        let status = state.run_status();
        let contacts = &state.funnel.contacts;
        let email_coverage =
            (contacts.total > 0).then(|| contacts.with_email as f64 / contacts.total as f64);
        Self {
            has_run: state.run.is_some(),
            is_active: status.is_some_and(RunStatus::is_active),
            is_terminal: status.is_some_and(RunStatus::is_terminal),
            status,
            stage: state.run.as_ref().and_then(|run| run.stage.clone()),
            outcome: state.run.as_ref().and_then(|run| run.outcome_type),
            email_coverage,
            fetched_at: state.meta.fetched_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_protocol::ExecutionRun;
    use pretty_assertions::assert_eq;

    fn state_with_run(status: RunStatus) -> ExecutionState {
        let mut state = ExecutionState::fallback("cmp-1");
        state.run = Some(ExecutionRun {
            id: "run-1".to_string(),
            status,
            stage: Some("lead_generation".to_string()),
            started_at: None,
            completed_at: None,
            termination_reason: None,
            error_message: None,
            outcome_type: None,
        });
        state
    }

    #[test]
    fn empty_state_has_no_run() {
        let state = ExecutionState::fallback("cmp-1");
        let summary = ExecutionSummary::from_state(&state);
        assert_eq!(
            summary,
            ExecutionSummary {
                has_run: false,
                is_active: false,
                is_terminal: false,
                status: None,
                stage: None,
                outcome: None,
                email_coverage: None,
                fetched_at: state.meta.fetched_at,
            }
        );
    }

    #[test]
    fn active_and_terminal_follow_status() {
        let running = ExecutionSummary::from_state(&state_with_run(RunStatus::Running));
        assert!(running.is_active);
        assert!(!running.is_terminal);
        assert_eq!(running.stage.as_deref(), Some("lead_generation"));

        let stopped = ExecutionSummary::from_state(&state_with_run(RunStatus::Stopped));
        assert!(!stopped.is_active);
        assert!(stopped.is_terminal);

        let unknown = ExecutionSummary::from_state(&state_with_run(RunStatus::Unknown));
        assert!(unknown.has_run);
        assert!(!unknown.is_active);
        assert!(!unknown.is_terminal);
    }

    #[test]
    fn outcome_is_kept_as_reported() {
        let mut state = state_with_run(RunStatus::Completed);
        if let Some(run) = state.run.as_mut() {
            run.outcome_type = Some(OutcomeType::ValidEmptyObservation);
        }
        let summary = ExecutionSummary::from_state(&state);
        assert_eq!(summary.outcome, Some(OutcomeType::ValidEmptyObservation));
    }

    #[test]
    fn email_coverage_guards_zero_contacts() {
        let mut state = state_with_run(RunStatus::Running);
        assert_eq!(ExecutionSummary::from_state(&state).email_coverage, None);

        state.funnel.contacts.total = 8;
        state.funnel.contacts.with_email = 2;
        assert_eq!(ExecutionSummary::from_state(&state).email_coverage, Some(0.25));
    }
}
