use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Map, Value};

use crate::credential;
use crate::error::AppError;
use crate::models::portal::{LoadPortalQuery, PortalRecord, SavePortalRequest, SavePortalResponse};
use crate::portal_id::generate_portal_id;
use crate::AppState;

const PASSWORD_HEADER: &str = "x-portal-password";

/// POST /api/portal — blind upsert of a portal document. A `passcode` in the
/// payload is converted to salt+hash columns and stripped; the raw passcode
/// is never persisted.
pub async fn save_portal(
    State(state): State<AppState>,
    Json(body): Json<SavePortalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pid = match body.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate_portal_id(),
    };

    tracing::info!(
        handler = "save_portal",
        portal_id = %pid,
        generated = body.id.as_deref().map_or(true, str::is_empty),
        "Handler: POST /api/portal"
    );

    let mut payload: Map<String, Value> = body
        .data
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default();

    // A null or empty passcode means "unprotected". Any other non-string
    // shape fails the save: silently storing the portal without protection
    // would leave the client believing a passcode was applied.
    let passcode = match payload.remove("passcode") {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::String(_)) | Some(Value::Null) | None => None,
        Some(other) => {
            tracing::warn!(
                handler = "save_portal",
                portal_id = %pid,
                "Rejecting save: passcode is not a string"
            );
            return Err(AppError::InvalidData(format!(
                "passcode must be a string, got {}",
                match other {
                    Value::Bool(_) => "a boolean",
                    Value::Number(_) => "a number",
                    Value::Array(_) => "an array",
                    Value::Object(_) => "an object",
                    _ => "an unexpected value",
                }
            )));
        }
    };

    let record = if let Some(passcode) = passcode {
        tracing::debug!(handler = "save_portal", portal_id = %pid, "Deriving credential for passcode");
        let cred = credential::derive_credential_blocking(passcode).await?;
        PortalRecord {
            id: pid.clone(),
            payload: Value::Object(payload).to_string(),
            pass_salt: Some(cred.salt),
            pass_hash: Some(cred.hash),
            pass_iterations: Some(cred.iterations as i64),
            pass_digest: Some(cred.digest.to_string()),
        }
    } else {
        PortalRecord {
            id: pid.clone(),
            payload: Value::Object(payload).to_string(),
            pass_salt: None,
            pass_hash: None,
            pass_iterations: None,
            pass_digest: None,
        }
    };

    tracing::debug!(handler = "save_portal", portal_id = %pid, "Dispatching to store.upsert_portal");
    state
        .store
        .upsert_portal(&record)
        .await
        .map_err(AppError::save)?;

    tracing::info!(
        handler = "save_portal",
        portal_id = %pid,
        protected = record.pass_hash.is_some(),
        status = 200,
        "Responding: portal saved"
    );

    Ok(Json(SavePortalResponse { id: pid }))
}

/// GET /api/portal?id=&password= — fetch a portal, enforcing the password
/// gate and bumping the view counter. The password may also arrive in the
/// x-portal-password header.
pub async fn load_portal(
    State(state): State<AppState>,
    Query(params): Query<LoadPortalQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let id = match params.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Err(AppError::MissingId),
    };

    tracing::info!(handler = "load_portal", portal_id = %id, "Handler: GET /api/portal");

    tracing::debug!(handler = "load_portal", portal_id = %id, "Dispatching to store.fetch_portal");
    let row = state
        .store
        .fetch_portal(&id)
        .await
        .map_err(AppError::load)?
        .ok_or(AppError::NotFound)?;

    if let Some(expected_hash) = row.pass_hash.clone() {
        let provided = headers
            .get(PASSWORD_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or(params.password.clone())
            .filter(|p| !p.is_empty());

        let Some(provided) = provided else {
            // Tell the client a password is needed without leaking content
            // and without counting a view.
            tracing::info!(
                handler = "load_portal",
                portal_id = %id,
                status = 200,
                "Responding: protected marker (no password supplied)"
            );
            return Ok(Json(json!({ "protected": true, "id": id })));
        };

        let salt = row.pass_salt.clone().unwrap_or_default();
        let iterations = row
            .pass_iterations
            .unwrap_or(credential::PASS_ITERATIONS as i64) as u32;
        let digest = row
            .pass_digest
            .clone()
            .unwrap_or_else(|| credential::PASS_DIGEST.to_string());

        tracing::debug!(handler = "load_portal", portal_id = %id, "Verifying supplied password");
        let ok = credential::verify_passcode_blocking(provided, salt, iterations, digest, expected_hash)
            .await?;

        if !ok {
            tracing::warn!(handler = "load_portal", portal_id = %id, "Password mismatch");
            return Err(AppError::InvalidPassword);
        }
    }

    // Best-effort view count: a failed increment is logged and suppressed,
    // the reader still gets their portal.
    let views = match state.store.increment_views(&id).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(portal_id = %id, error = %e, "View increment failed, reporting fetched count + 1");
            row.views + 1
        }
    };

    let mut payload: Map<String, Value> = serde_json::from_str::<Value>(&row.payload)
        .ok()
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default();

    // Echo the hash so the client can remember the portal is protected; the
    // salt and KDF parameters stay server-side.
    payload.insert(
        "passcodeHash".to_string(),
        row.pass_hash.clone().map(Value::String).unwrap_or(Value::Null),
    );
    payload.insert("stats".to_string(), json!({ "views": views }));

    tracing::info!(
        handler = "load_portal",
        portal_id = %id,
        views,
        protected = row.pass_hash.is_some(),
        status = 200,
        "Responding: portal loaded"
    );

    Ok(Json(json!({ "data": payload })))
}
