//! API endpoint parsing

use reqwest::Url;
use std::fmt;
use std::str::FromStr;

use crate::error::{ClientError, Result};

/// Base URL of the Bluepipe API, split into origin and path prefix
///
/// `address` is `scheme://host[:port]` with no path; `prefix` is the path
/// with trailing slashes removed (possibly empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    address: String,
    prefix: String,
}

impl Endpoint {
    /// Parse an endpoint URL such as `https://api.1stblue.cloud/api/v1/`
    pub fn parse(endpoint: &str) -> Result<Self> {
        let trimmed = endpoint.trim();
        let url = Url::parse(trimmed)
            .map_err(|e| ClientError::invalid_endpoint(trimmed, e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::invalid_endpoint(
                trimmed,
                "scheme must be http or https",
            ));
        }

        if url.host_str().is_none() {
            return Err(ClientError::invalid_endpoint(trimmed, "missing host"));
        }

        Ok(Self {
            address: url.origin().ascii_serialization(),
            prefix: url.path().trim_end_matches('/').to_string(),
        })
    }

    /// Scheme and authority, e.g. `https://api.1stblue.cloud`
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Path prefix without trailing slash, e.g. `/api/v1`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl FromStr for Endpoint {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Endpoint::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.address, self.prefix)
    }
}
