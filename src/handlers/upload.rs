use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine;
use rand::Rng;

use crate::error::AppError;
use crate::models::upload::{UploadRequest, UploadResponse};
use crate::util::{now_millis, sanitize_filename};
use crate::AppState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Split a `data:<mime>;base64,<payload>` URI into (content type, base64
/// payload). Bare base64 passes through with the default content type.
fn parse_data_url(data: &str) -> (&str, &str) {
    if let Some(rest) = data.strip_prefix("data:") {
        if let Some((mime, b64)) = rest.split_once(";base64,") {
            if !mime.is_empty() {
                return (mime, b64);
            }
            return (DEFAULT_CONTENT_TYPE, b64);
        }
    }
    (DEFAULT_CONTENT_TYPE, data)
}

/// POST /api/upload — store a base64 or data-URL payload, respond with the
/// public URL it will be served from.
pub async fn upload(
    State(state): State<AppState>,
    Json(body): Json<UploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let data = match body.data.as_deref() {
        Some(d) if !d.is_empty() => d,
        _ => return Err(AppError::MissingData),
    };

    let hint = sanitize_filename(body.filename.as_deref().unwrap_or("upload.bin"));

    tracing::info!(
        handler = "upload",
        filename = %hint,
        data_len = data.len(),
        "Handler: POST /api/upload"
    );

    let (content_type, b64) = parse_data_url(data);
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| AppError::InvalidData(format!("invalid base64: {e}")))?;

    // Timestamp for ordering, random discriminator so concurrent uploads of
    // the same filename never collide on a key.
    let nonce: [u8; 2] = rand::thread_rng().gen();
    let key = format!("{}-{}-{}", now_millis(), hex::encode(nonce), hint);

    tracing::debug!(handler = "upload", key = %key, "Dispatching to store.put_object");
    state
        .store
        .put_object(&key, content_type, &bytes)
        .await
        .map_err(AppError::upload)?;

    let url = format!("{}/files/{}", state.public_base_url, key);

    tracing::info!(
        handler = "upload",
        key = %key,
        content_type = %content_type,
        stored_bytes = bytes.len(),
        status = 200,
        "Responding: object stored"
    );

    Ok(Json(UploadResponse { url }))
}
