//! Signed HTTP transport
//!
//! Sends one request per call, with no retry, and normalizes whatever comes
//! back into an [`ApiResponse`]. Only network-level failures surface as
//! errors.

use chrono::Utc;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::endpoint::Endpoint;
use crate::error::{ClientError, Result};
use crate::protocol::ProtocolVersion;
use crate::signer::{Credentials, Signer, canonical_query};

/// Request timeout applied when none is configured
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Value of the `User-Agent` header
pub const USER_AGENT: &str = concat!("cli-rs/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Request / Response
// =============================================================================

/// A request relative to the endpoint prefix
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Add a query parameter, replacing any previous value for the key
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }
}

/// Normalized view of a server response
///
/// When the body carries the standard envelope (`success` and `code`),
/// those fields take precedence over the HTTP status. Callers must not
/// interpret the payload of an unsuccessful response, so [`data`](Self::data)
/// yields nothing in that case.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    success: bool,
    code: i64,
    message: String,
    data: Option<Value>,
}

impl ApiResponse {
    /// Normalize a raw HTTP status and body
    pub fn from_http(status: StatusCode, body: &[u8]) -> Self {
        let http_code = i64::from(status.as_u16());
        let reason = status.canonical_reason().unwrap_or("Unknown Status");
        let text = String::from_utf8_lossy(body);
        let text = text.trim();
        let fallback = if text.is_empty() {
            reason.to_string()
        } else {
            format!("{}: {}", reason, text)
        };

        if !status.is_success() {
            return Self::failure(http_code, fallback);
        }

        let Ok(Value::Object(mut envelope)) = serde_json::from_slice::<Value>(body) else {
            return Self::failure(http_code, fallback);
        };

        let success = envelope.get("success").and_then(Value::as_bool);
        let code = envelope
            .get("code")
            .filter(|code| !code.is_null())
            .map(|code| parse_code(code).unwrap_or(http_code));

        let (Some(success), Some(code)) = (success, code) else {
            return Self::failure(http_code, fallback);
        };

        let message = match envelope.remove("message") {
            Some(Value::String(message)) => message,
            Some(Value::Null) | None => reason.to_string(),
            Some(other) => other.to_string(),
        };

        Self {
            success,
            code,
            message,
            data: envelope.remove("data").filter(|data| !data.is_null()),
        }
    }

    fn failure(code: i64, message: String) -> Self {
        Self {
            success: false,
            code,
            message,
            data: None,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Envelope code, or the HTTP status when there is no envelope
    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Payload of a successful response
    pub fn data(&self) -> Option<&Value> {
        if self.success { self.data.as_ref() } else { None }
    }

    /// Consume the response, keeping the payload of a successful response
    pub fn into_data(self) -> Option<Value> {
        if self.success { self.data } else { None }
    }
}

fn parse_code(code: &Value) -> Option<i64> {
    code.as_i64()
        .or_else(|| code.as_str().and_then(|s| s.trim().parse().ok()))
}

// =============================================================================
// Transport
// =============================================================================

/// Sends signed requests to one endpoint
#[derive(Debug, Clone)]
pub struct Transport {
    endpoint: Endpoint,
    access_id: String,
    signer: Signer,
    protocol: ProtocolVersion,
    client: Client,
}

impl Transport {
    /// Create a transport with the default request timeout
    pub fn new(
        endpoint: Endpoint,
        credentials: Credentials,
        protocol: ProtocolVersion,
    ) -> Result<Self> {
        let client = http_client(DEFAULT_REQUEST_TIMEOUT)?;
        Ok(Self::with_client(endpoint, credentials, protocol, client))
    }

    /// Create a transport around a preconfigured reqwest client
    ///
    /// The client's own timeout is the only timeout applied.
    pub fn with_client(
        endpoint: Endpoint,
        credentials: Credentials,
        protocol: ProtocolVersion,
        client: Client,
    ) -> Self {
        Self {
            endpoint,
            signer: Signer::new(credentials.access_key, protocol),
            access_id: credentials.access_id,
            protocol,
            client,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    /// Prefix the path and merge its query string with `extra`
    ///
    /// Parameters in `extra` win over ones already present in `path`. The
    /// result is what gets signed and what goes on the wire.
    pub fn normalize_path(&self, path: &str, extra: &BTreeMap<String, String>) -> String {
        let (raw_path, raw_query) = path.split_once('?').unwrap_or((path, ""));

        let mut params: BTreeMap<String, String> = raw_query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();

        for (key, value) in extra {
            params.insert(key.trim().to_string(), value.trim().to_string());
        }

        let base = format!("{}{}", self.endpoint.prefix(), raw_path);
        if params.is_empty() {
            base
        } else {
            format!("{}?{}", base, canonical_query(&params))
        }
    }

    /// Sign and send a request
    ///
    /// # Returns
    /// The normalized response, whatever the HTTP status was
    ///
    /// # Errors
    /// [`ClientError::Network`] when the server could not be reached, the
    /// request timed out, or the body could not be read
    pub async fn call(&self, request: ApiRequest) -> Result<ApiResponse> {
        let path_and_query = self.normalize_path(&request.path, &request.query);

        let mut headers: Vec<(&str, String)> = vec![
            ("Accept", "application/json".to_string()),
            ("Date", Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()),
            ("User-Agent", USER_AGENT.to_string()),
            ("Content-Type", "application/json".to_string()),
            (self.protocol.access_id_header(), self.access_id.clone()),
            (self.protocol.nonce_header(), Uuid::new_v4().simple().to_string()),
        ];

        let signature = self.signer.sign(
            request.method.as_str(),
            &path_and_query,
            headers.iter().map(|(name, value)| (*name, value.as_str())),
            request.body.as_deref(),
        );
        headers.push(("Authorization", format!("APIKEY {}", signature)));

        let url = format!("{}{}", self.endpoint.address(), path_and_query);
        let method = request.method;

        let mut builder = self.client.request(method.clone(), &url);
        for (name, value) in &headers {
            builder = builder.header(*name, value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        debug!(%method, %url, "sending signed request");

        let response = builder.send().await.map_err(|err| {
            warn!(%method, %url, error = %err, "request failed");
            ClientError::Network(err)
        })?;

        let status = response.status();
        let body = response.bytes().await?;
        debug!(%method, %url, %status, "received response");

        Ok(ApiResponse::from_http(status, &body))
    }
}

/// reqwest client with a per-request timeout
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ClientError::Build)
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.trim().to_string())
        .unwrap_or_else(|_| spaced.trim().to_string())
}
