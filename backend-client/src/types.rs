use chrono::DateTime;
use chrono::Utc;
use outreach_protocol::ExecutionFunnel;
use outreach_protocol::ExecutionRun;
use outreach_protocol::ExecutionState;
use outreach_protocol::StateMeta;
use outreach_protocol::StateOrigin;
use serde::Deserialize;

/// Body of `GET /execution-state`. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStateResponse {
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub run: Option<ExecutionRun>,
    #[serde(default)]
    pub funnel: Option<ExecutionFunnel>,
}

impl ExecutionStateResponse {
    /// Fill in defaults and stamp fetch metadata.
    pub fn into_state(self, requested_id: &str, fetched_at: DateTime<Utc>) -> ExecutionState {
        ExecutionState {
            campaign_id: self
                .campaign_id
                .unwrap_or_else(|| requested_id.to_string()),
            run: self.run,
            funnel: self.funnel.unwrap_or_default(),
            meta: StateMeta {
                fetched_at,
                source: StateOrigin::Remote,
            },
        }
    }
}
