//! Job DTOs sent to and received from the start endpoint

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::instance::InstanceId;
use crate::domain::job::JobSubmission;

/// Start request body of the current protocol
///
/// Both maps are keyed by canonical (`/`-separated) table name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartJobRequest {
    /// Read offset in milliseconds
    pub table_offset: BTreeMap<String, i64>,
    /// Readiness checkpoint in milliseconds
    pub ready_offset: BTreeMap<String, i64>,
}

impl From<&JobSubmission> for StartJobRequest {
    fn from(submission: &JobSubmission) -> Self {
        let table = submission.canonical_table();
        Self {
            table_offset: BTreeMap::from([(table.clone(), submission.offset_millis())]),
            ready_offset: BTreeMap::from([(table, submission.ready_offset_millis())]),
        }
    }
}

/// Single-table start request body of the legacy protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyStartJobRequest {
    pub tables: String,
    pub offset: i64,
    pub timely: i64,
}

impl From<&JobSubmission> for LegacyStartJobRequest {
    fn from(submission: &JobSubmission) -> Self {
        Self {
            tables: submission.canonical_table(),
            offset: submission.offset_millis(),
            timely: submission.ready_offset_millis(),
        }
    }
}

/// One element of the start response's `data` array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedInstance {
    #[serde(default)]
    pub instance_id: Option<InstanceId>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_start_request_shape() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let submission = JobSubmission::new("42", "db.schema.orders").with_offset(at);

        let body = serde_json::to_value(StartJobRequest::from(&submission)).unwrap();
        assert_eq!(
            body,
            json!({
                "table_offset": { "db/schema/orders": 1_767_225_600_000i64 },
                "ready_offset": { "db/schema/orders": 0 }
            })
        );
    }

    #[test]
    fn test_legacy_start_request_shape() {
        let submission = JobSubmission::new("42", "db.orders");

        let body = serde_json::to_value(LegacyStartJobRequest::from(&submission)).unwrap();
        assert_eq!(
            body,
            json!({ "tables": "db/orders", "offset": -1, "timely": 0 })
        );
    }

    #[test]
    fn test_submitted_instance_keeps_extra_fields() {
        let submitted: SubmittedInstance = serde_json::from_value(json!({
            "jobId": 42,
            "instanceId": "i-1",
            "logview": "https://example.com/log"
        }))
        .unwrap();

        assert_eq!(submitted.instance_id, Some(InstanceId::from("i-1")));
        assert_eq!(submitted.extra.get("jobId"), Some(&json!(42)));
    }
}
