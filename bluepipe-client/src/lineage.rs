//! Lineage API endpoints

use bluepipe_core::domain::lineage::LineageRecord;
use bluepipe_core::dto::lineage::LineageSearchResult;
use tracing::warn;

use crate::JobClient;
use crate::transport::ApiRequest;

impl JobClient {
    /// Find the tables fed by a source table
    ///
    /// # Arguments
    /// * `table` - Qualified source table name, e.g. "tpch.lineitem"
    /// * `target` - Optional target system to restrict the search to
    ///
    /// # Returns
    /// Matching lineage records (possibly empty), or `None` if the request failed
    pub async fn search_lineage(&self, table: &str, target: Option<&str>) -> Option<Vec<LineageRecord>> {
        let path = match target {
            Some(target) => format!("/lineage/search/{}", urlencoding::encode(target)),
            None => "/lineage/search".to_string(),
        };

        let response = self
            .call_checked("Lineage search", table, ApiRequest::get(path).query("table", table))
            .await?;

        let Some(data) = response.into_data() else {
            return Some(Vec::new());
        };

        match serde_json::from_value::<LineageSearchResult>(data) {
            Ok(result) => Some(result.records),
            Err(e) => {
                warn!("Lineage search of ({}) returned unexpected data: {}", table, e);
                None
            }
        }
    }
}
