//! Instance DTOs

use serde::{Deserialize, Serialize};

/// Body of the stop endpoint
///
/// `message` is sent as `null` when no reason is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopInstanceRequest {
    pub message: Option<String>,
}
