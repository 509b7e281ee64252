//! Job submission domain types

use chrono::{DateTime, Utc};

/// Offset sent when the caller does not bound the read position
pub const NO_OFFSET: i64 = -1;

/// Readiness threshold sent when the caller does not require one
pub const NO_READY_OFFSET: i64 = 0;

/// A request to start one job over one source table
///
/// Offsets are points in time; they are sent as milliseconds since epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSubmission {
    pub job_id: String,
    pub table: String,
    pub offset: Option<DateTime<Utc>>,
    pub ready_offset: Option<DateTime<Utc>>,
}

impl JobSubmission {
    pub fn new(job_id: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            table: table.into(),
            offset: None,
            ready_offset: None,
        }
    }

    /// Sets the read offset
    pub fn with_offset(mut self, offset: DateTime<Utc>) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the readiness threshold
    pub fn with_ready_offset(mut self, ready_offset: DateTime<Utc>) -> Self {
        self.ready_offset = Some(ready_offset);
        self
    }

    /// Table name in the `/`-separated form the API expects
    pub fn canonical_table(&self) -> String {
        canonical_table(&self.table)
    }

    /// Read offset in milliseconds, or [`NO_OFFSET`]
    pub fn offset_millis(&self) -> i64 {
        self.offset
            .map(|t| t.timestamp_millis())
            .unwrap_or(NO_OFFSET)
    }

    /// Readiness threshold in milliseconds, or [`NO_READY_OFFSET`]
    pub fn ready_offset_millis(&self) -> i64 {
        self.ready_offset
            .map(|t| t.timestamp_millis())
            .unwrap_or(NO_READY_OFFSET)
    }

    /// Human-readable summary used in log lines
    ///
    /// e.g. `job=42, table=db.orders, offset=2026-01-01 00:00`
    pub fn describe(&self) -> String {
        let mut parts = vec![
            format!("job={}", self.job_id),
            format!("table={}", self.table),
        ];
        if let Some(offset) = self.offset {
            parts.push(format!("offset={}", offset.format("%Y-%m-%d %H:%M")));
        }
        if let Some(ready) = self.ready_offset {
            parts.push(format!("timely={}", ready.format("%Y-%m-%d %H:%M")));
        }
        parts.join(", ")
    }
}

/// Replaces the `.` separators of a qualified table name with `/`
pub fn canonical_table(table: &str) -> String {
    table.replace('.', "/")
}
