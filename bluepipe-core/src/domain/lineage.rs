//! Lineage domain types

use serde::{Deserialize, Serialize};

/// One downstream edge of a source table
///
/// Only the destination table and the job that feeds it are interpreted;
/// everything else the server reports is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineageRecord {
    #[serde(default)]
    pub dst_table: Option<String>,
    #[serde(default)]
    pub job_guid: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
