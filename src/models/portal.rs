use serde::{Deserialize, Serialize};
use serde_json::Value;

/// POST /api/portal body. `data` is the celebration document and stays
/// opaque to the server apart from the `passcode` key.
#[derive(Debug, Deserialize)]
pub struct SavePortalRequest {
    pub id: Option<String>,
    pub data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct SavePortalResponse {
    pub id: String,
}

/// GET /api/portal query string. The password may arrive here or in the
/// x-portal-password header.
#[derive(Debug, Deserialize)]
pub struct LoadPortalQuery {
    pub id: Option<String>,
    pub password: Option<String>,
}

/// Row written on save. Password columns are all None or all Some.
#[derive(Debug)]
pub struct PortalRecord {
    pub id: String,
    pub payload: String, // JSON text
    pub pass_salt: Option<String>,
    pub pass_hash: Option<String>,
    pub pass_iterations: Option<i64>,
    pub pass_digest: Option<String>,
}

/// Row read on load.
#[derive(Debug, sqlx::FromRow)]
pub struct PortalRow {
    pub payload: String,
    pub pass_salt: Option<String>,
    pub pass_hash: Option<String>,
    pub pass_iterations: Option<i64>,
    pub pass_digest: Option<String>,
    pub views: i64,
}
