use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::credential::HashError;
use crate::store::StoreError;

/// Request-level errors, mapped to the stable machine-readable codes the
/// frontend matches on. 500 bodies deliberately carry backend detail; this
/// is part of the documented contract for this service.
pub enum AppError {
    MissingId,
    MissingData,
    MissingQuery,
    InvalidData(String),
    NotFound,
    InvalidPassword,
    SchemaMissing,
    BucketMissing,
    Save(sqlx::Error),
    Load(sqlx::Error),
    Upload(sqlx::Error),
    Hash(HashError),
    Search(String),
}

impl AppError {
    /// Map a store failure from the save path.
    pub fn save(e: StoreError) -> Self {
        match e {
            StoreError::SchemaMissing => AppError::SchemaMissing,
            StoreError::BucketMissing => AppError::BucketMissing,
            StoreError::Db(e) => AppError::Save(e),
        }
    }

    /// Map a store failure from the load path.
    pub fn load(e: StoreError) -> Self {
        match e {
            StoreError::SchemaMissing => AppError::SchemaMissing,
            StoreError::BucketMissing => AppError::BucketMissing,
            StoreError::Db(e) => AppError::Load(e),
        }
    }

    /// Map a store failure from the upload path.
    pub fn upload(e: StoreError) -> Self {
        match e {
            StoreError::SchemaMissing => AppError::SchemaMissing,
            StoreError::BucketMissing => AppError::BucketMissing,
            StoreError::Db(e) => AppError::Upload(e),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MissingId => write!(f, "missing id"),
            AppError::MissingData => write!(f, "missing data"),
            AppError::MissingQuery => write!(f, "missing query"),
            AppError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            AppError::NotFound => write!(f, "not found"),
            AppError::InvalidPassword => write!(f, "invalid password"),
            AppError::SchemaMissing => write!(f, "portals table missing"),
            AppError::BucketMissing => write!(f, "objects table missing"),
            AppError::Save(e) => write!(f, "save failed: {e}"),
            AppError::Load(e) => write!(f, "load failed: {e}"),
            AppError::Upload(e) => write!(f, "upload failed: {e}"),
            AppError::Hash(e) => write!(f, "hash failed: {e}"),
            AppError::Search(msg) => write!(f, "search failed: {msg}"),
        }
    }
}

impl From<HashError> for AppError {
    fn from(e: HashError) -> Self {
        AppError::Hash(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::MissingId => {
                tracing::warn!(error_type = "missing_id", "Responding with 400");
                (StatusCode::BAD_REQUEST, json!({ "error": "missing_id" }))
            }
            AppError::MissingData => {
                tracing::warn!(error_type = "missing_data", "Responding with 400");
                (StatusCode::BAD_REQUEST, json!({ "error": "missing_data" }))
            }
            AppError::MissingQuery => {
                tracing::warn!(error_type = "missing_query", "Responding with 400");
                (StatusCode::BAD_REQUEST, json!({ "error": "missing_query" }))
            }
            AppError::InvalidData(msg) => {
                tracing::warn!(error_type = "invalid_data", message = %msg, "Responding with 400");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "invalid_data", "details": msg }),
                )
            }
            AppError::NotFound => {
                tracing::warn!(error_type = "not_found", "Responding with 404");
                (StatusCode::NOT_FOUND, json!({ "error": "not_found" }))
            }
            AppError::InvalidPassword => {
                tracing::warn!(error_type = "invalid_password", "Responding with 401");
                (
                    StatusCode::UNAUTHORIZED,
                    json!({ "error": "invalid_password" }),
                )
            }
            AppError::SchemaMissing => {
                tracing::error!(error_type = "table_missing", "Responding with 500");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "table_missing",
                        "message": "The portals table does not exist. Run the setup SQL in migrations/001_initial.sql."
                    }),
                )
            }
            AppError::BucketMissing => {
                tracing::error!(error_type = "bucket_missing", "Responding with 500");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "bucket_missing",
                        "message": "The objects table does not exist. Run the setup SQL in migrations/001_initial.sql."
                    }),
                )
            }
            AppError::Save(e) => {
                tracing::error!(error_type = "save_failed", error = %e, "Responding with 500");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "save_failed", "details": e.to_string() }),
                )
            }
            AppError::Load(e) => {
                tracing::error!(error_type = "load_failed", error = %e, "Responding with 500");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "load_failed",
                        "message": e.to_string(),
                        "details": e.to_string()
                    }),
                )
            }
            AppError::Upload(e) => {
                tracing::error!(error_type = "upload_failed", error = %e, "Responding with 500");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "upload_failed", "details": e.to_string() }),
                )
            }
            AppError::Hash(e) => {
                tracing::error!(error_type = "hash_failed", error = %e, "Responding with 500");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "hash_failed", "details": e.to_string() }),
                )
            }
            AppError::Search(msg) => {
                tracing::error!(error_type = "search_failed", error = %msg, "Responding with 500");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "search_failed", "details": msg }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
