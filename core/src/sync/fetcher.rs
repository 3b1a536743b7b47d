use async_trait::async_trait;
use outreach_backend_client::Client;
use outreach_backend_client::FetchError;
use outreach_protocol::ExecutionState;

/// Source of execution snapshots. Implementations perform exactly one
/// request per call and never consult the cache.
#[async_trait]
pub trait StateFetcher: Send + Sync {
    async fn fetch(&self, campaign_id: &str) -> Result<ExecutionState, FetchError>;
}

#[async_trait]
impl StateFetcher for Client {
    async fn fetch(&self, campaign_id: &str) -> Result<ExecutionState, FetchError> {
        self.get_execution_state(campaign_id).await
    }
}
