//! Lineage command handler

use anyhow::Result;
use bluepipe_core::domain::lineage::LineageRecord;
use serde::Serialize;
use tracing::error;

use super::Outcome;
use crate::config::Config;

/// One line of the lineage listing
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct LineageEntry<'a> {
    dst_table: Option<&'a str>,
    job_guid: Option<&'a str>,
}

impl<'a> From<&'a LineageRecord> for LineageEntry<'a> {
    fn from(record: &'a LineageRecord) -> Self {
        Self {
            dst_table: record.dst_table.as_deref(),
            job_guid: record.job_guid.as_deref(),
        }
    }
}

/// Print the tables fed by `table` as a JSON array
pub async fn search(table: &str, target: Option<&str>, config: &Config) -> Result<Outcome> {
    let client = config.client()?;

    let Some(records) = client.search_lineage(table, target).await else {
        error!("Lineage search for {} failed", table);
        return Ok(Outcome::RequestFailed);
    };

    let entries: Vec<LineageEntry> = records.iter().map(LineageEntry::from).collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);

    Ok(Outcome::Success)
}
