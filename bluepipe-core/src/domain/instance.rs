//! Job instance domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one running execution of a job
///
/// Assigned by the server when a job is started.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        InstanceId(s)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        InstanceId(s.to_string())
    }
}

/// Lifecycle state reported in an instance's `last_status`
///
/// Parsing is case-insensitive. Anything absent or unrecognized is `Unknown`,
/// which pollers treat as still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum InstanceState {
    Running,
    Finished,
    Killed,
    Failed,
    #[default]
    Unknown,
}

impl InstanceState {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "RUNNING" => InstanceState::Running,
            "FINISHED" => InstanceState::Finished,
            "KILLED" => InstanceState::Killed,
            "FAILED" => InstanceState::Failed,
            _ => InstanceState::Unknown,
        }
    }

    /// FINISHED, KILLED and FAILED are terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InstanceState::Finished | InstanceState::Killed | InstanceState::Failed
        )
    }

    /// Upper-case banner used in logs and on the wire
    pub fn banner(&self) -> &'static str {
        match self {
            InstanceState::Running => "RUNNING",
            InstanceState::Finished => "FINISHED",
            InstanceState::Killed => "KILLED",
            InstanceState::Failed => "FAILED",
            InstanceState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.banner())
    }
}

impl From<Option<String>> for InstanceState {
    fn from(value: Option<String>) -> Self {
        value
            .as_deref()
            .map(InstanceState::parse)
            .unwrap_or_default()
    }
}

impl From<InstanceState> for String {
    fn from(state: InstanceState) -> Self {
        state.banner().to_string()
    }
}

/// Status of an instance as returned by the API
///
/// Progress counters are optional; the server reports `-1` or omits them
/// before the first batch is written. Each field is read on its own, so a
/// malformed counter never hides `last_status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceStatus {
    #[serde(default, deserialize_with = "lenient::state")]
    pub last_status: InstanceState,
    #[serde(
        default,
        deserialize_with = "lenient::rows",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_rows: Option<i64>,
    /// Throughput in bytes per second
    #[serde(
        default,
        deserialize_with = "lenient::rate",
        skip_serializing_if = "Option::is_none"
    )]
    pub byteps: Option<f64>,
}

/// Deserializers that map unexpected JSON shapes to "not reported"
mod lenient {
    use super::InstanceState;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn state<'de, D: Deserializer<'de>>(deserializer: D) -> Result<InstanceState, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => InstanceState::parse(&s),
            _ => InstanceState::Unknown,
        })
    }

    /// Integers as-is, finite floats truncated, numeric strings parsed
    pub fn rows<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) if n.is_i64() => n.as_i64(),
            other => number(&other).map(|f| f.trunc() as i64),
        })
    }

    pub fn rate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(number(&Value::deserialize(deserializer)?))
    }

    fn number(value: &Value) -> Option<f64> {
        let f = match value {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        f.is_finite().then_some(f)
    }
}

impl InstanceStatus {
    pub fn state(&self) -> InstanceState {
        self.last_status
    }

    /// Rows written so far, if reported
    pub fn rows(&self) -> Option<i64> {
        self.total_rows.filter(|rows| *rows > -1)
    }

    /// Throughput in MB/s rounded to two decimals, if reported
    pub fn throughput_mbps(&self) -> Option<f64> {
        self.byteps
            .filter(|bps| *bps > -1.0)
            .map(|bps| (bps / 1_048_576.0 * 100.0).round() / 100.0)
    }

    /// Progress suffix for log lines, e.g. `: rows=1,024, bps=1.5 MB/s`
    ///
    /// Empty when no row count has been reported; throughput is only shown
    /// alongside a row count.
    pub fn progress_detail(&self) -> String {
        let Some(rows) = self.rows() else {
            return String::new();
        };

        let mut detail = format!(": rows={}", group_thousands(rows));
        if let Some(speed) = self.throughput_mbps() {
            detail.push_str(&format!(", bps={} MB/s", speed));
        }
        detail
    }
}

/// Formats an integer with `,` thousands separators
fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
