//! Identity provider boundary. The booking engine trusts the bearer token's
//! claims as opaque input; issuing tokens is someone else's job.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    EventManager,
    User,
}

impl Role {
    /// Only venue staff may drive the check-in gate.
    pub fn can_scan(self) -> bool {
        matches!(self, Role::Admin | Role::EventManager)
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Uuid,
    role: Role,
    #[allow(dead_code)]
    exp: usize,
}

/// Authenticated caller extracted from the Authorization header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid bearer token")]
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AuthError::MissingToken)?;

        let data = decode::<Claims>(token, &state.jwt_key, &Validation::new(Algorithm::HS256))
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthUser {
            user_id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_permission_by_role() {
        assert!(Role::Admin.can_scan());
        assert!(Role::EventManager.can_scan());
        assert!(!Role::User.can_scan());
    }

    #[test]
    fn roles_parse_from_claim_values() {
        assert_eq!("event_manager".parse::<Role>().unwrap(), Role::EventManager);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("superuser".parse::<Role>().is_err());
    }
}
