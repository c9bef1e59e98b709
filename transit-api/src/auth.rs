use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use transit_core::Role;
use uuid::Uuid;

use crate::{error::AppError, middleware::Claims, state::{AppState, AuthConfig}};

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/guest", post(login_guest))
}

/// Signs an HS256 token for `subject`. Credential checks for operators and
/// administrators happen outside this service.
pub fn issue_token(auth: &AuthConfig, subject: &str, role: Role) -> Result<String, AppError> {
    let exp = Utc::now()
        .checked_add_signed(auth.expiration)
        .and_then(|at| usize::try_from(at.timestamp()).ok())
        .ok_or_else(|| AppError::InternalServerError("Token expiry out of range".to_string()))?;
    let claims = Claims {
        sub: subject.to_string(),
        role,
        exp,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

async fn login_guest(State(state): State<AppState>) -> Result<Json<AuthResponse>, AppError> {
    let subject = format!("guest-{}", Uuid::new_v4());
    let token = issue_token(&state.auth, &subject, Role::Commuter)?;
    tracing::info!("Issued guest commuter token for {}", subject);
    Ok(Json(AuthResponse { token }))
}
