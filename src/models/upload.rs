use serde::{Deserialize, Serialize};

/// POST /api/upload body. `data` is either bare base64 or a
/// `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub filename: Option<String>,
    pub data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Object as stored, served back at /files/{key}.
#[derive(Debug, sqlx::FromRow)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}
