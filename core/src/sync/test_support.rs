use super::fetcher::StateFetcher;
use async_trait::async_trait;
use chrono::Utc;
use outreach_backend_client::FetchError;
use outreach_protocol::ExecutionFunnel;
use outreach_protocol::ExecutionRun;
use outreach_protocol::ExecutionState;
use outreach_protocol::RunStatus;
use outreach_protocol::StateMeta;
use outreach_protocol::StateOrigin;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Replays queued responses per campaign. The last queued response repeats
/// once the queue is down to one item.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Result<ExecutionState, FetchError>>>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Mutex<Duration>,
    campaign_delays: Mutex<HashMap<String, Duration>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, campaign_id: &str, result: Result<ExecutionState, FetchError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(campaign_id.to_string())
            .or_default()
            .push_back(result);
    }

    /// Drop whatever is queued for the campaign and respond with `result` from now on.
    pub(crate) fn replace(&self, campaign_id: &str, result: Result<ExecutionState, FetchError>) {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.entry(campaign_id.to_string()).or_default();
        queue.clear();
        queue.push_back(result);
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Overrides the shared delay for one campaign.
    pub(crate) fn set_campaign_delay(&self, campaign_id: &str, delay: Duration) {
        self.campaign_delays
            .lock()
            .unwrap()
            .insert(campaign_id.to_string(), delay);
    }

    pub(crate) fn calls(&self, campaign_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(campaign_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl StateFetcher for ScriptedFetcher {
    async fn fetch(&self, campaign_id: &str) -> Result<ExecutionState, FetchError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(campaign_id.to_string())
            .or_default() += 1;
        let campaign_delay = self.campaign_delays.lock().unwrap().get(campaign_id).copied();
        let delay = campaign_delay.unwrap_or_else(|| *self.delay.lock().unwrap());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.entry(campaign_id.to_string()).or_default();
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        next.unwrap_or_else(|| Err(FetchError::status(404, "no script")))
    }
}

pub(crate) fn run_state(campaign_id: &str, status: RunStatus) -> ExecutionState {
    ExecutionState {
        campaign_id: campaign_id.to_string(),
        run: Some(ExecutionRun {
            id: format!("{campaign_id}-run"),
            status,
            stage: None,
            started_at: Some(Utc::now()),
            completed_at: status.is_terminal().then(Utc::now),
            termination_reason: None,
            error_message: None,
            outcome_type: None,
        }),
        funnel: ExecutionFunnel::default(),
        meta: StateMeta {
            fetched_at: Utc::now(),
            source: StateOrigin::Remote,
        },
    }
}

pub(crate) fn idle_state(campaign_id: &str) -> ExecutionState {
    ExecutionState {
        run: None,
        ..run_state(campaign_id, RunStatus::Queued)
    }
}
