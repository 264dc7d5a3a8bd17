use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;

use crate::error::AppError;
use crate::AppState;

/// GET /files/{key} — serve a stored object with its recorded content type.
pub async fn serve_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(handler = "serve_object", key = %key, "Handler: GET /files/{{key}}");

    let object = state
        .store
        .get_object(&key)
        .await
        .map_err(AppError::load)?
        .ok_or(AppError::NotFound)?;

    tracing::debug!(
        handler = "serve_object",
        key = %key,
        content_type = %object.content_type,
        object_bytes = object.bytes.len(),
        "Responding: object"
    );

    Ok(([(header::CONTENT_TYPE, object.content_type)], object.bytes))
}
