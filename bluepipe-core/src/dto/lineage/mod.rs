//! Lineage DTOs

use serde::{Deserialize, Serialize};

use crate::domain::lineage::LineageRecord;

/// `data` payload of the lineage search endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineageSearchResult {
    #[serde(default)]
    pub records: Vec<LineageRecord>,
}
