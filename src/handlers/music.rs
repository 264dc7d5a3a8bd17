use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::AppState;

const ITUNES_SEARCH_URL: &str = "https://itunes.apple.com/search";

#[derive(Debug, Deserialize)]
pub struct MusicSearchQuery {
    pub query: Option<String>,
}

/// GET /api/music_search?query= — proxy to the iTunes search API so the
/// browser never has to talk to Apple cross-origin. Upstream JSON is passed
/// through verbatim.
pub async fn music_search(
    State(state): State<AppState>,
    Query(params): Query<MusicSearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let query = match params.query.as_deref() {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return Err(AppError::MissingQuery),
    };

    tracing::info!(handler = "music_search", query = %query, "Handler: GET /api/music_search");

    let response = state
        .http
        .get(ITUNES_SEARCH_URL)
        .query(&[
            ("term", query.as_str()),
            ("media", "music"),
            ("limit", "20"),
            ("entity", "song"),
        ])
        .send()
        .await
        .map_err(|e| AppError::Search(e.to_string()))?;

    if !response.status().is_success() {
        return Err(AppError::Search(format!(
            "iTunes API error: {}",
            response.status()
        )));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| AppError::Search(e.to_string()))?;

    tracing::info!(
        handler = "music_search",
        query = %query,
        status = 200,
        "Responding: search results"
    );

    Ok(Json(body))
}
