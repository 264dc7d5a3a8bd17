use axum::{extract::State, response::IntoResponse, Json};

use crate::error::AppError;
use crate::AppState;

/// GET /admin/stats — global portal and view totals, grouped by celebration
/// type. Guarded by the admin token middleware.
pub async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = state.store.site_stats().await.map_err(AppError::load)?;
    Ok(Json(stats))
}
