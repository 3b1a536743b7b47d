use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use std::fmt;

/// Lifecycle status of one execution run as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    RunRequested,
    InProgress,
    Running,
    Completed,
    Failed,
    Stopped,
    Cancelled,
    /// Any status string this client does not know about.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Statuses for which the backend is still doing work and polling should continue.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RunStatus::Queued | RunStatus::RunRequested | RunStatus::InProgress | RunStatus::Running
        )
    }

    /// Statuses after which the run never changes again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Stopped | RunStatus::Cancelled
        )
    }

    /// Cached snapshots for these statuses are dropped as soon as they are written.
    #[must_use]
    pub fn evicts_on_write(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::RunRequested => "run_requested",
            RunStatus::InProgress => "in_progress",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Stopped => "stopped",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic outcome of a run. A run that legitimately observed nothing is
/// `ValidEmptyObservation`, not a failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeType {
    ValidEmptyObservation,
    ConfigIncomplete,
    InfraError,
    ExecutionError,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRun {
    pub id: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_type: Option<OutcomeType>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationCounts {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContactCounts {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub with_email: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeadCounts {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pending: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub approved: u64,
}

/// Pipeline counters for a campaign. Zero is also what the wire sends for
/// "not yet observed", so consult the run before reading meaning into it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionFunnel {
    #[serde(default, deserialize_with = "null_as_default")]
    pub organizations: OrganizationCounts,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contacts: ContactCounts,
    #[serde(default, deserialize_with = "null_as_default")]
    pub leads: LeadCounts,
    #[serde(default, deserialize_with = "null_as_default")]
    pub emails_sent: u64,
}

/// Counters and count groups treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StateOrigin {
    /// Decoded from a successful backend response.
    Remote,
    /// Placeholder surfaced while loading or after a failed fetch.
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StateMeta {
    pub fetched_at: DateTime<Utc>,
    pub source: StateOrigin,
}

/// Canonical execution snapshot for one campaign. `run == None` means no run
/// has ever been requested, which is a valid state rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    pub campaign_id: String,
    pub run: Option<ExecutionRun>,
    pub funnel: ExecutionFunnel,
    pub meta: StateMeta,
}

impl ExecutionState {
    /// Degraded-but-valid state used while loading and on the error path.
    pub fn fallback(campaign_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            run: None,
            funnel: ExecutionFunnel::default(),
            meta: StateMeta {
                fetched_at: Utc::now(),
                source: StateOrigin::Fallback,
            },
        }
    }

    pub fn run_status(&self) -> Option<RunStatus> {
        self.run.as_ref().map(|run| run.status)
    }

    /// True while the current run is still progressing on the backend.
    pub fn is_active(&self) -> bool {
        self.run_status().is_some_and(RunStatus::is_active)
    }
}
