use serde::Serialize;
use std::collections::BTreeMap;

/// Global portal statistics for the admin endpoint. `by_type` groups
/// portals by the `celebrationType` field of their payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    pub total_portals: i64,
    pub total_views: i64,
    pub by_type: BTreeMap<String, i64>,
    pub collected_at: i64,
}
