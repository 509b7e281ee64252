//! Bluepipe HTTP Client
//!
//! A signed HTTP client for the Bluepipe orchestration API: submit replication
//! jobs, follow their instances until they finish, and kill them on shutdown.
//!
//! The client is built in layers:
//! - [`Signer`]: HMAC-SHA1 request signatures
//! - [`Transport`]: signed requests and response envelope normalization
//! - [`JobClient`]: job/instance operations and the set of tracked instances
//! - [`JobClient::wait_finished`]: polls tracked instances until they are terminal
//!
//! # Example
//!
//! ```no_run
//! use bluepipe_client::{JobClient, WaitOptions};
//! use bluepipe_core::domain::job::JobSubmission;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut client = JobClient::new("https://api.1stblue.cloud/api/v1", "etl", "secret")?;
//!
//!     let submission = JobSubmission::new("42", "db.orders");
//!     if client.submit(&submission).await.is_none() {
//!         anyhow::bail!("submit failed");
//!     }
//!
//!     let finished = client.wait_finished(&WaitOptions::default()).await;
//!     println!("finished: {}", finished);
//!     Ok(())
//! }
//! ```

pub mod endpoint;
pub mod error;
mod jobs;
mod lineage;
pub mod protocol;
pub mod signer;
pub mod transport;
pub mod waiter;

// Re-export commonly used types
pub use bluepipe_core::domain::instance::{InstanceId, InstanceState, InstanceStatus};
pub use endpoint::Endpoint;
pub use error::{ClientError, Result};
pub use protocol::ProtocolVersion;
pub use signer::{Credentials, Signer};
pub use transport::{ApiRequest, ApiResponse, Transport};
pub use waiter::{CompletionPolicy, WaitOptions};

use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;

use crate::transport::{DEFAULT_REQUEST_TIMEOUT, http_client};

/// Client for the Bluepipe job API
///
/// Owns the set of instances it is tracking: submitting a job adds the
/// returned instances, and waiting removes each one as soon as it reaches a
/// terminal state. A removed instance is never tracked again by the same
/// client.
#[derive(Debug)]
pub struct JobClient {
    transport: Transport,
    /// Instances being followed, in submission order
    tracked: Vec<InstanceId>,
    /// Instances observed in a terminal state
    retired: HashSet<InstanceId>,
}

impl JobClient {
    /// Create a client speaking the current protocol
    ///
    /// # Arguments
    /// * `endpoint` - Base URL of the API, e.g. "https://api.1stblue.cloud/api/v1"
    /// * `access_id` - Public access id
    /// * `access_key` - Secret key used to sign requests
    ///
    /// # Example
    /// ```
    /// use bluepipe_client::JobClient;
    ///
    /// let client = JobClient::new("http://localhost:8080/api/v1/", "etl", "secret").unwrap();
    /// assert_eq!(client.endpoint().prefix(), "/api/v1");
    /// ```
    pub fn new(
        endpoint: &str,
        access_id: impl Into<String>,
        access_key: impl Into<String>,
    ) -> Result<Self> {
        Self::builder(endpoint)
            .credentials(Credentials::new(access_id, access_key))
            .build()
    }

    /// Start building a client with non-default settings
    pub fn builder(endpoint: impl Into<String>) -> JobClientBuilder {
        JobClientBuilder::new(endpoint)
    }

    /// Create a client on top of an existing transport
    pub fn with_transport(transport: Transport) -> Self {
        Self {
            transport,
            tracked: Vec::new(),
            retired: HashSet::new(),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.transport.endpoint()
    }

    pub fn protocol(&self) -> ProtocolVersion {
        self.transport.protocol()
    }

    /// Instances currently being tracked
    pub fn tracked(&self) -> &[InstanceId] {
        &self.tracked
    }
}

/// Builder for [`JobClient`]
#[derive(Debug)]
pub struct JobClientBuilder {
    endpoint: String,
    credentials: Credentials,
    protocol: ProtocolVersion,
    request_timeout: Duration,
    client: Option<Client>,
}

impl JobClientBuilder {
    fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials: Credentials::new("", ""),
            protocol: ProtocolVersion::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            client: None,
        }
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    /// Timeout of each individual request (default 10 seconds)
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Use a preconfigured reqwest client; `request_timeout` is then ignored
    pub fn http_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<JobClient> {
        let endpoint = Endpoint::parse(&self.endpoint)?;

        let client = match self.client {
            Some(client) => client,
            None => http_client(self.request_timeout)?,
        };

        Ok(JobClient::with_transport(Transport::with_client(
            endpoint,
            self.credentials,
            self.protocol,
            client,
        )))
    }
}
