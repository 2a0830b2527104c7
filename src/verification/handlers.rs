use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::instrument;

use super::services;
use crate::{dto::SuccessResponse, error::AppError, state::AppState};

pub fn verify_routes() -> Router<AppState> {
    Router::new().route("/api/verify-email", post(verify_email))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// POST /api/verify-email { token }
#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> Result<Json<SuccessResponse>, AppError> {
    let token = payload
        .and_then(|Json(p)| p.token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::validation("Verification token is required"))?;

    services::redeem(&state, &token)
        .await
        .map_err(|e| e.public_message("Failed to verify email"))?;

    Ok(Json(SuccessResponse::ok()))
}
