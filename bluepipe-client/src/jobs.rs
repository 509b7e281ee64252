//! Job and instance API endpoints

use bluepipe_core::domain::instance::{InstanceId, InstanceStatus};
use bluepipe_core::domain::job::JobSubmission;
use bluepipe_core::dto::instance::StopInstanceRequest;
use bluepipe_core::dto::job::SubmittedInstance;
use serde_json::Value;
use tracing::{info, warn};

use crate::JobClient;
use crate::transport::{ApiRequest, ApiResponse};

impl JobClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Start a job over one table
    ///
    /// Every instance id in the response is added to the tracked set.
    ///
    /// # Arguments
    /// * `submission` - Job id, table and optional offsets
    ///
    /// # Returns
    /// The instances the server started, or `None` if the request failed
    ///
    /// # Example
    /// ```no_run
    /// # use bluepipe_client::JobClient;
    /// # use bluepipe_core::domain::job::JobSubmission;
    /// # async fn example() -> anyhow::Result<()> {
    /// let mut client = JobClient::new("http://localhost:8080/api/v1", "etl", "secret")?;
    /// let instances = client
    ///     .submit(&JobSubmission::new("42", "db.schema.orders"))
    ///     .await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit(&mut self, submission: &JobSubmission) -> Option<Vec<SubmittedInstance>> {
        let context = submission.describe();
        let path = format!("/job/{}/start", urlencoding::encode(&submission.job_id));
        let body = self.protocol().start_body(submission);

        let request = match ApiRequest::post(path).json(&body) {
            Ok(request) => request,
            Err(e) => {
                warn!("Submit Failed: {}, error={}", context, e);
                return None;
            }
        };

        let response = match self.transport.call(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Submit Failed: {}, error={}", context, e);
                return None;
            }
        };

        if !response.success() {
            warn!(
                "Submit Failed: {}, code={}, message={}",
                context,
                response.code(),
                response.message()
            );
            return None;
        }

        let entries: Vec<Value> = match response.into_data() {
            None => Vec::new(),
            Some(data) => match serde_json::from_value(data) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Submit Failed: {}, unexpected response: {}", context, e);
                    return None;
                }
            },
        };

        // Malformed entries are skipped, the rest are still tracked
        let submitted: Vec<SubmittedInstance> = entries
            .into_iter()
            .filter(|entry| !entry.is_null())
            .filter_map(|entry| {
                serde_json::from_value(entry.clone())
                    .map_err(|e| {
                        warn!("Submit: {}, skipping entry {}: {}", context, entry, e)
                    })
                    .ok()
            })
            .collect();

        for entry in &submitted {
            if let Some(instance) = &entry.instance_id {
                if self.track(instance.clone()) {
                    info!("Submit OK: {}, instance={}", context, instance);
                }
            }
        }

        Some(submitted)
    }

    // =============================================================================
    // Instance Operations
    // =============================================================================

    /// Get the status of an instance
    ///
    /// # Arguments
    /// * `instance` - The instance id
    ///
    /// # Returns
    /// The reported status, or `None` if the request failed
    pub async fn get_status(&self, instance: &InstanceId) -> Option<InstanceStatus> {
        let path = self
            .protocol()
            .status_path(&urlencoding::encode(instance.as_str()));

        let data = self
            .call_checked("Status", instance, ApiRequest::get(path))
            .await?
            .into_data()?;

        serde_json::from_value(data)
            .map_err(|e| warn!("Status of instance ({}) unreadable: {}", instance, e))
            .ok()
    }

    /// Ask the server to stop an instance
    ///
    /// The call is always made, even when the instance is already known to be
    /// terminal; the server treats that as a no-op.
    ///
    /// # Arguments
    /// * `instance` - The instance id
    /// * `message` - Optional human-readable reason
    ///
    /// # Returns
    /// The response payload (`Value::Null` when there is none), or `None` if
    /// the request failed
    pub async fn kill_instance(&self, instance: &InstanceId, message: Option<&str>) -> Option<Value> {
        let path = format!("/instance/{}/stop", urlencoding::encode(instance.as_str()));
        let body = StopInstanceRequest {
            message: message.map(str::to_string),
        };

        let request = match ApiRequest::post(path).json(&body) {
            Ok(request) => request,
            Err(e) => {
                warn!("Kill of instance ({}) failed: {}", instance, e);
                return None;
            }
        };

        let response = self.call_checked("Kill", instance, request).await?;
        Some(response.into_data().unwrap_or(Value::Null))
    }

    /// Kill every tracked instance
    ///
    /// Best-effort: a failed kill is logged and the remaining instances are
    /// still attempted. Meant to be called when the process is asked to
    /// terminate.
    ///
    /// # Returns
    /// How many kill requests the server acknowledged
    pub async fn shutdown(&self, message: Option<&str>) -> usize {
        let mut acknowledged = 0;

        for instance in &self.tracked {
            info!("Killing instance ({})", instance);
            if self.kill_instance(instance, message).await.is_some() {
                acknowledged += 1;
            }
        }

        acknowledged
    }

    // =============================================================================
    // Tracked Instances
    // =============================================================================

    /// Follow an instance started elsewhere
    ///
    /// # Returns
    /// `false` if the id is empty, already tracked, or was already seen in a
    /// terminal state by this client
    pub fn track(&mut self, instance: impl Into<InstanceId>) -> bool {
        let instance = instance.into();
        if instance.is_empty()
            || self.retired.contains(&instance)
            || self.tracked.contains(&instance)
        {
            return false;
        }

        self.tracked.push(instance);
        true
    }

    /// Stop tracking an instance for good
    pub(crate) fn retire(&mut self, instance: &InstanceId) {
        self.tracked.retain(|tracked| tracked != instance);
        self.retired.insert(instance.clone());
    }

    /// Send a request and keep the response only if it succeeded
    ///
    /// Network and server-reported failures are logged at warn level.
    pub(crate) async fn call_checked(
        &self,
        action: &str,
        subject: impl std::fmt::Display,
        request: ApiRequest,
    ) -> Option<ApiResponse> {
        match self.transport.call(request).await {
            Ok(response) if response.success() => Some(response),
            Ok(response) => {
                warn!(
                    "{} of ({}) failed: code={}, message={}",
                    action,
                    subject,
                    response.code(),
                    response.message()
                );
                None
            }
            Err(e) => {
                warn!("{} of ({}) failed: {}", action, subject, e);
                None
            }
        }
    }
}
