//! Waiting for tracked instances to finish
//!
//! A cooperative polling loop over the client's tracked set. Instances are
//! polled one after another; there is no cancellation primitive, the caller
//! drops the future (and usually calls [`JobClient::shutdown`]) instead.

use bluepipe_core::domain::instance::InstanceState;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::JobClient;

/// Pause between polling passes when none is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// What counts as success once every tracked instance is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPolicy {
    /// At least one instance reached FINISHED
    #[default]
    AnyFinished,
    /// Every instance reached FINISHED
    AllFinished,
}

/// Settings for [`JobClient::wait_finished`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Sleep between two passes over the tracked set
    pub poll_interval: Duration,
    /// Give up after this long; `None` waits indefinitely
    pub timeout: Option<Duration>,
    pub policy: CompletionPolicy,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            policy: CompletionPolicy::default(),
        }
    }
}

impl WaitOptions {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// A zero timeout means no timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl JobClient {
    /// Poll every tracked instance until all of them are terminal
    ///
    /// Each pass fetches the status of every tracked instance in turn, logs
    /// it, and drops the ones that reached FINISHED, KILLED or FAILED. A
    /// failed status request counts as UNKNOWN and the instance keeps being
    /// polled.
    ///
    /// # Returns
    /// `false` if the timeout expired with instances still tracked (they stay
    /// tracked), or if nothing was tracked to begin with. Otherwise the
    /// verdict of `options.policy`.
    pub async fn wait_finished(&mut self, options: &WaitOptions) -> bool {
        if self.tracked.is_empty() {
            info!("No instances to wait for");
            return false;
        }

        let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
        let mut any_finished = false;
        let mut all_finished = true;

        loop {
            let pass = self.tracked.clone();
            for instance in &pass {
                let status = self.get_status(instance).await.unwrap_or_default();
                let state = status.state();
                let detail = status.progress_detail();

                if state == InstanceState::Unknown {
                    warn!("instance ({}) {}{}", instance, state, detail);
                } else {
                    info!("instance ({}) {}{}", instance, state, detail);
                }

                if state.is_terminal() {
                    self.retire(instance);
                    if state == InstanceState::Finished {
                        any_finished = true;
                    } else {
                        all_finished = false;
                    }
                }
            }

            if self.tracked.is_empty() {
                break;
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!(
                    remaining = self.tracked.len(),
                    "Timed out waiting for instances to finish"
                );
                return false;
            }

            tokio::time::sleep(options.poll_interval).await;
        }

        match options.policy {
            CompletionPolicy::AnyFinished => any_finished,
            CompletionPolicy::AllFinished => any_finished && all_finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluepipe_core::domain::instance::InstanceId;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> JobClient {
        JobClient::new(&format!("{}/api/v1", server.uri()), "etl", "secret").unwrap()
    }

    fn fast() -> WaitOptions {
        WaitOptions::default().with_poll_interval(Duration::from_millis(10))
    }

    async fn mount_status(server: &MockServer, instance: &str, status: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/instance/{}", instance)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "code": 0,
                "data": { "last_status": status, "total_rows": 5 }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_wait_immediate_finish() {
        let mock_server = MockServer::start().await;
        mount_status(&mock_server, "i-1", "FINISHED").await;

        let mut client = client_for(&mock_server);
        client.track("i-1");

        assert!(client.wait_finished(&fast()).await);
        assert!(client.tracked().is_empty());
    }

    #[tokio::test]
    async fn test_finished_with_fractional_row_count() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/instance/i-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "code": 0,
                "data": { "last_status": "FINISHED", "total_rows": 1200.0, "byteps": 10 }
            })))
            .mount(&mock_server)
            .await;

        let mut client = client_for(&mock_server);
        client.track("i-1");

        let options = fast().with_timeout(Duration::from_millis(300));
        assert!(client.wait_finished(&options).await);
        assert!(client.tracked().is_empty());
    }

    #[tokio::test]
    async fn test_wait_times_out_while_running() {
        let mock_server = MockServer::start().await;
        mount_status(&mock_server, "i-1", "RUNNING").await;

        let mut client = client_for(&mock_server);
        client.track("i-1");

        let options = fast().with_timeout(Duration::from_millis(200));
        assert!(!client.wait_finished(&options).await);
        assert_eq!(client.tracked(), &[InstanceId::from("i-1")]);
    }

    #[tokio::test]
    async fn test_wait_with_nothing_tracked() {
        let mock_server = MockServer::start().await;
        let mut client = client_for(&mock_server);

        assert!(!client.wait_finished(&fast()).await);
    }

    #[tokio::test]
    async fn test_any_finished_policy() {
        let mock_server = MockServer::start().await;
        mount_status(&mock_server, "ok", "FINISHED").await;
        mount_status(&mock_server, "bad", "FAILED").await;

        let mut client = client_for(&mock_server);
        client.track("ok");
        client.track("bad");

        assert!(client.wait_finished(&fast()).await);
        assert!(client.tracked().is_empty());
    }

    #[tokio::test]
    async fn test_all_finished_policy() {
        let mock_server = MockServer::start().await;
        mount_status(&mock_server, "ok", "FINISHED").await;
        mount_status(&mock_server, "bad", "KILLED").await;

        let mut client = client_for(&mock_server);
        client.track("ok");
        client.track("bad");

        let options = fast().with_policy(CompletionPolicy::AllFinished);
        assert!(!client.wait_finished(&options).await);
        assert!(client.tracked().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_keeps_polling() {
        let mock_server = MockServer::start().await;

        // First two polls fail, then the instance reports FINISHED
        Mock::given(method("GET"))
            .and(path("/api/v1/instance/i-1"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&mock_server)
            .await;
        mount_status(&mock_server, "i-1", "FINISHED").await;

        let mut client = client_for(&mock_server);
        client.track("i-1");

        assert!(client.wait_finished(&fast()).await);

        let polls = mock_server.received_requests().await.unwrap().len();
        assert_eq!(polls, 3);
    }

    #[tokio::test]
    async fn test_removal_is_monotonic() {
        let mock_server = MockServer::start().await;
        mount_status(&mock_server, "i-1", "FINISHED").await;

        Mock::given(method("POST"))
            .and(path("/api/v1/job/42/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "code": 0,
                "data": [{ "instanceId": "i-1" }]
            })))
            .mount(&mock_server)
            .await;

        let mut client = client_for(&mock_server);
        client.track("i-1");
        assert!(client.wait_finished(&fast()).await);

        // A later response naming the same instance does not bring it back
        let submission = bluepipe_core::domain::job::JobSubmission::new("42", "db.t");
        assert!(client.submit(&submission).await.is_some());
        assert!(client.tracked().is_empty());
        assert!(!client.track("i-1"));
    }
}
