//! Protocol versions
//!
//! The API has gone through two wire dialects. They differ in the prefix of
//! the signed custom headers, the shape of the start request, and the status
//! path. Everything else is shared, so a single transport is parameterized by
//! [`ProtocolVersion`].

use bluepipe_core::domain::job::JobSubmission;
use bluepipe_core::dto::job::{LegacyStartJobRequest, StartJobRequest};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Wire dialect spoken by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolVersion {
    /// Legacy dialect: `X-CA-*` headers, single-table start body
    V1,
    /// Current dialect: `X-Api-*` headers, per-table offset maps
    #[default]
    V2,
}

/// Start request body for either dialect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StartBody {
    Legacy(LegacyStartJobRequest),
    Current(StartJobRequest),
}

impl ProtocolVersion {
    /// Lowercase prefix of the custom headers covered by the signature
    pub fn signed_header_prefix(&self) -> &'static str {
        match self {
            ProtocolVersion::V1 => "x-ca-",
            ProtocolVersion::V2 => "x-api-",
        }
    }

    /// Header carrying the public access id
    pub fn access_id_header(&self) -> &'static str {
        match self {
            ProtocolVersion::V1 => "X-CA-Key",
            ProtocolVersion::V2 => "X-Api-Key",
        }
    }

    /// Header carrying the per-request nonce
    pub fn nonce_header(&self) -> &'static str {
        match self {
            ProtocolVersion::V1 => "X-CA-Nonce",
            ProtocolVersion::V2 => "X-Api-Nonce",
        }
    }

    /// Status path for an already percent-encoded instance id
    pub fn status_path(&self, encoded_instance: &str) -> String {
        match self {
            ProtocolVersion::V1 => format!("/instance/{}/status", encoded_instance),
            ProtocolVersion::V2 => format!("/instance/{}", encoded_instance),
        }
    }

    /// Body of the start request
    pub fn start_body(&self, submission: &JobSubmission) -> StartBody {
        match self {
            ProtocolVersion::V1 => StartBody::Legacy(submission.into()),
            ProtocolVersion::V2 => StartBody::Current(submission.into()),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V1 => f.write_str("v1"),
            ProtocolVersion::V2 => f.write_str("v2"),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" | "legacy" => Ok(ProtocolVersion::V1),
            "v2" | "2" | "current" => Ok(ProtocolVersion::V2),
            other => Err(format!("unknown protocol version '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_protocol() {
        assert_eq!("v1".parse::<ProtocolVersion>(), Ok(ProtocolVersion::V1));
        assert_eq!("V2".parse::<ProtocolVersion>(), Ok(ProtocolVersion::V2));
        assert!("v3".parse::<ProtocolVersion>().is_err());
    }

    #[test]
    fn test_status_path() {
        assert_eq!(ProtocolVersion::V2.status_path("abc"), "/instance/abc");
        assert_eq!(ProtocolVersion::V1.status_path("abc"), "/instance/abc/status");
    }

    #[test]
    fn test_start_body_is_untagged() {
        let submission = JobSubmission::new("7", "db.orders");

        let current = serde_json::to_value(ProtocolVersion::V2.start_body(&submission)).unwrap();
        assert_eq!(
            current,
            json!({ "table_offset": { "db/orders": -1 }, "ready_offset": { "db/orders": 0 } })
        );

        let legacy = serde_json::to_value(ProtocolVersion::V1.start_body(&submission)).unwrap();
        assert_eq!(legacy, json!({ "tables": "db/orders", "offset": -1, "timely": 0 }));
    }
}
