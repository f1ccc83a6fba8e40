use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::routes::ErrorBody;
use crate::services::gate::{self, GateAction, GateError};

#[derive(Debug, Deserialize)]
pub struct CheckinRequest {
    pub pass_id: Uuid,
    pub action: GateAction,
}

#[derive(Debug, Serialize)]
pub struct CheckinResponse {
    pub pass_id: Uuid,
    pub is_inside: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_scanned: Option<DateTime<Utc>>,
}

/// POST /api/v1/checkin — drive the gate state machine for one pass.
///
/// State-sensitive by design: a replayed or out-of-order scan gets a 409
/// conflict with the reason, never a silent success.
pub async fn checkin(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CheckinRequest>,
) -> Result<Json<CheckinResponse>, (StatusCode, Json<ErrorBody>)> {
    if !user.role.can_scan() {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorBody::new("role is not allowed to scan passes")),
        ));
    }

    match gate::scan(&state.db, req.pass_id, req.action).await {
        Ok(pass) => {
            metrics::counter!("checkin_scans_total", "action" => req.action.to_string())
                .increment(1);
            tracing::info!(
                pass_id = %pass.id,
                action = %req.action,
                is_inside = pass.is_inside,
                "Gate transition applied"
            );
            Ok(Json(CheckinResponse {
                pass_id: pass.id,
                is_inside: pass.is_inside,
                time_scanned: pass.time_scanned,
            }))
        }
        Err(GateError::PassNotFound) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new("pass not found")),
        )),
        Err(GateError::InvalidTransition(msg)) => {
            tracing::warn!(pass_id = %req.pass_id, action = %req.action, "Rejected gate transition");
            Err((StatusCode::CONFLICT, Json(ErrorBody::new(msg))))
        }
        Err(GateError::Database(e)) => {
            tracing::error!(pass_id = %req.pass_id, error = %e, "Gate scan failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("internal error")),
            ))
        }
    }
}
