use crate::error::FetchError;
use crate::types::ExecutionStateResponse;
use chrono::Utc;
use outreach_protocol::ExecutionState;
use reqwest::header::ACCEPT;
use reqwest::header::USER_AGENT;
use tracing::debug;
use tracing::warn;
use url::Url;

pub const EXECUTION_STATE_PATH: &str = "execution-state";

const USER_AGENT_VALUE: &str = concat!("outreach/", env!("CARGO_PKG_VERSION"));

/// Read-only client for the campaign backend.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let parsed = Url::parse(base_url).map_err(|err| FetchError::InvalidUrl {
            url: base_url.to_string(),
            message: err.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl {
                url: base_url.to_string(),
                message: "url cannot be used as a base".to_string(),
            });
        }
        Ok(Self {
            base_url: parsed,
            http: reqwest::Client::new(),
        })
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn execution_state_url(&self, campaign_id: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidUrl {
                url: self.base_url.to_string(),
                message: "url cannot be used as a base".to_string(),
            })?
            .pop_if_empty()
            .push(EXECUTION_STATE_PATH);
        url.query_pairs_mut().append_pair("campaignId", campaign_id);
        Ok(url)
    }

    /// `GET /execution-state?campaignId=<id>`, normalized into an [`ExecutionState`].
    pub async fn get_execution_state(
        &self,
        campaign_id: &str,
    ) -> Result<ExecutionState, FetchError> {
        let url = self.execution_state_url(campaign_id)?;
        debug!("fetching execution state from {url}");

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&body).into_owned();
            warn!(
                "execution state for campaign {campaign_id} returned HTTP {}",
                status.as_u16()
            );
            return Err(FetchError::status(status.as_u16(), text));
        }

        let decoded: ExecutionStateResponse =
            serde_json::from_slice(&body).map_err(|err| FetchError::Decode {
                message: err.to_string(),
            })?;
        let state = decoded.into_state(campaign_id, Utc::now());
        if state.campaign_id != campaign_id {
            warn!(
                "backend answered campaign {} for request {campaign_id}",
                state.campaign_id
            );
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;
    use outreach_protocol::RunStatus;
    use outreach_protocol::StateOrigin;
    use pretty_assertions::assert_eq;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::method;
    use wiremock::matchers::path;
    use wiremock::matchers::query_param;

    #[test]
    fn builds_url_under_base_path() {
        let client = Client::new("http://localhost:8080/api/").expect("client");
        let url = client.execution_state_url("cmp 1").expect("url");
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/execution-state?campaignId=cmp+1"
        );

        let client = Client::new("http://localhost:8080").expect("client");
        let url = client.execution_state_url("c").expect("url");
        assert_eq!(url.as_str(), "http://localhost:8080/execution-state?campaignId=c");
    }

    #[test]
    fn rejects_unusable_base_url() {
        let err = Client::new("not a url").expect_err("invalid");
        assert_eq!(err.kind(), FetchErrorKind::Unknown);
        let err = Client::new("mailto:ops@example.com").expect_err("cannot be base");
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn decodes_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/execution-state"))
            .and(query_param("campaignId", "cmp-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"campaignId":"cmp-1","run":{"id":"r1","status":"running"},"funnel":{"emailsSent":5}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new(&server.uri()).expect("client");
        let state = client.get_execution_state("cmp-1").await.expect("state");
        assert_eq!(state.campaign_id, "cmp-1");
        assert_eq!(state.run_status(), Some(RunStatus::Running));
        assert_eq!(state.funnel.emails_sent, 5);
        assert_eq!(state.meta.source, StateOrigin::Remote);

        server.verify().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn classifies_http_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("campaignId", "missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such campaign"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("campaignId", "flaky"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = Client::new(&server.uri()).expect("client");

        let err = client.get_execution_state("missing").await.expect_err("404");
        assert_eq!(err.kind(), FetchErrorKind::NotFound);
        assert_eq!(err.http_status(), Some(404));

        let err = client.get_execution_state("flaky").await.expect_err("503");
        assert_eq!(err.kind(), FetchErrorKind::ServerError);
        assert!(err.is_retryable());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn non_json_body_is_a_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let client = Client::new(&server.uri()).expect("client");
        let err = client.get_execution_state("cmp-1").await.expect_err("decode");
        assert!(matches!(err, FetchError::Decode { .. }));
        assert_eq!(err.kind(), FetchErrorKind::NetworkError);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unreachable_host_is_a_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("listener");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = Client::new(&format!("http://{addr}")).expect("client");
        let err = client.get_execution_state("cmp-1").await.expect_err("refused");
        assert_eq!(err.kind(), FetchErrorKind::NetworkError);
    }
}
