use axum::{
    extract::{FromRef, Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use super::{
    dto::{AuthResponse, GoogleCallback, PublicUser, RefreshRequest, SignInRequest},
    google::GoogleOAuth,
    jwt::JwtKeys,
    services::{authenticate, Credentials},
};
use crate::{error::AppError, state::AppState, users::User};

/// How long a pending Google authorization may take.
const OAUTH_STATE_TTL: Duration = Duration::minutes(10);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/google", get(google_start))
        .route("/api/auth/google/callback", get(google_callback))
}

fn session_for(state: &AppState, user: &User) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(state);
    let (access_token, refresh_token) = keys.sign_pair(user.id)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    }))
}

fn google_client(state: &AppState) -> Result<&GoogleOAuth, AppError> {
    state.google.as_deref().ok_or_else(|| {
        AppError::internal(
            "Google sign-in is not configured",
            anyhow::anyhow!("google oauth client missing"),
        )
    })
}

/// POST /api/auth/signin { email, password }
#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Option<Json<SignInRequest>>,
) -> Result<Json<AuthResponse>, AppError> {
    let Some(Json(payload)) = payload else {
        return Err(AppError::validation("Email and password are required"));
    };

    let user = authenticate(
        &state,
        Credentials::Password {
            email: payload.email,
            password: payload.password,
        },
    )
    .await
    .map_err(|e| e.public_message("Failed to sign in"))?;

    session_for(&state, &user)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthorized
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;

    session_for(&state, &user)
}

/// GET /api/auth/google: redirect the browser to Google's consent screen.
#[instrument(skip(state))]
pub async fn google_start(State(state): State<AppState>) -> Result<Redirect, AppError> {
    let google = google_client(&state)?;
    let request = google.authorize_url();

    state
        .users
        .save_oauth_state(
            &request.state,
            &request.pkce_verifier,
            OffsetDateTime::now_utc() + OAUTH_STATE_TTL,
        )
        .await
        .map_err(|e| AppError::internal("Failed to start Google sign-in", e))?;

    Ok(Redirect::to(&request.url))
}

/// GET /api/auth/google/callback?code=..&state=..
#[instrument(skip(state, query))]
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallback>,
) -> Result<Json<AuthResponse>, AppError> {
    let google = google_client(&state)?;

    let verifier = state
        .users
        .take_oauth_state(&query.state, OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| AppError::validation("Invalid or expired OAuth state"))?;

    let profile = google
        .fetch_profile(&query.code, verifier)
        .await
        .map_err(|e| AppError::internal("Google sign-in failed", e))?;

    let user = authenticate(&state, Credentials::Google(profile))
        .await
        .map_err(|e| e.public_message("Google sign-in failed"))?;

    info!(user_id = %user.id, "google session issued");
    session_for(&state, &user)
}
