use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// Approval/workflow state shown to operators. Independent of execution
/// outcome and of readiness.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GovernanceState {
    Draft,
    PendingApproval,
    ApprovedReady,
    Blocked,
    ExecutedReadOnly,
}

impl GovernanceState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GovernanceState::Draft => "DRAFT",
            GovernanceState::PendingApproval => "PENDING_APPROVAL",
            GovernanceState::ApprovedReady => "APPROVED_READY",
            GovernanceState::Blocked => "BLOCKED",
            GovernanceState::ExecutedReadOnly => "EXECUTED_READ_ONLY",
        }
    }
}

impl fmt::Display for GovernanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Campaign workflow statuses the backend is known to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CampaignStatus {
    Draft,
    PendingReview,
    Runnable,
    Running,
    Completed,
    Failed,
    Archived,
}

impl CampaignStatus {
    /// Trims and ignores ASCII case. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase();
        let status = match normalized.as_str() {
            "DRAFT" => CampaignStatus::Draft,
            "PENDING_REVIEW" => CampaignStatus::PendingReview,
            "RUNNABLE" => CampaignStatus::Runnable,
            "RUNNING" => CampaignStatus::Running,
            "COMPLETED" => CampaignStatus::Completed,
            "FAILED" => CampaignStatus::Failed,
            "ARCHIVED" => CampaignStatus::Archived,
            _ => return None,
        };
        Some(status)
    }

    /// Once a campaign has executed, governance no longer applies.
    fn has_executed(self) -> bool {
        matches!(
            self,
            CampaignStatus::Running
                | CampaignStatus::Completed
                | CampaignStatus::Failed
                | CampaignStatus::Archived
        )
    }
}

/// Maps a backend campaign status plus blocking signals to a governance state.
///
/// Executed statuses always yield `ExecutedReadOnly`, whatever the blocking
/// reasons say. Unrecognized statuses yield `Blocked`.
pub fn classify_governance<S: AsRef<str>>(
    status: &str,
    blocking_reasons: &[S],
    is_runnable: bool,
) -> GovernanceState {
    let Some(status) = CampaignStatus::parse(status) else {
        return GovernanceState::Blocked;
    };
    if status.has_executed() {
        return GovernanceState::ExecutedReadOnly;
    }

    let blocked = !blocking_reasons.is_empty();
    match status {
        CampaignStatus::Draft if blocked => GovernanceState::Blocked,
        CampaignStatus::Draft => GovernanceState::Draft,
        CampaignStatus::PendingReview if blocked => GovernanceState::Blocked,
        CampaignStatus::PendingReview => GovernanceState::PendingApproval,
        CampaignStatus::Runnable if is_runnable && !blocked => GovernanceState::ApprovedReady,
        CampaignStatus::Runnable => GovernanceState::Blocked,
        CampaignStatus::Running
        | CampaignStatus::Completed
        | CampaignStatus::Failed
        | CampaignStatus::Archived => GovernanceState::ExecutedReadOnly,
    }
}
