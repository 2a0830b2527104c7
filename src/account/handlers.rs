use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{AccountView, ChangeEmailRequest, SetPasswordRequest},
    services,
};
use crate::{auth::jwt::AuthUser, dto::SuccessResponse, error::AppError, state::AppState};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/user/email", post(change_email))
        .route("/api/user/password", post(set_password))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<AccountView>, AppError> {
    let user = services::current_user(&state, user_id).await?;
    Ok(Json(AccountView::from(user)))
}

/// POST /api/user/email { email }
#[instrument(skip(state, payload))]
pub async fn change_email(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Option<Json<ChangeEmailRequest>>,
) -> Result<Json<SuccessResponse>, AppError> {
    let email = payload.and_then(|Json(p)| p.email).unwrap_or_default();

    services::change_email(&state, user_id, &email)
        .await
        .map_err(|e| e.public_message("Failed to update email"))?;

    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/user/password { password, confirm_password? }
#[instrument(skip(state, payload))]
pub async fn set_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Option<Json<SetPasswordRequest>>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Some(Json(SetPasswordRequest {
        password: Some(password),
        confirm_password,
    })) = payload
    else {
        return Err(AppError::validation("Password is required"));
    };

    services::set_password(&state, user_id, &password, confirm_password.as_deref())
        .await
        .map_err(|e| e.public_message("Failed to set password"))?;

    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{NewUser, UserStore};
    use crate::users::memory::MemoryUserStore;
    use crate::mail::recording::RecordingMailer;
    use std::sync::Arc;

    #[tokio::test]
    async fn me_reflects_account_settings() {
        let store = Arc::new(MemoryUserStore::new());
        let user = store
            .create(NewUser {
                email: "a@x.com".into(),
                name: Some("Ann".into()),
                google_id: Some("sub-1".into()),
                email_verified: Some(time::OffsetDateTime::now_utc()),
                ..Default::default()
            })
            .await
            .unwrap();
        let state = AppState::fake_with(store, Arc::new(RecordingMailer::new()));

        let Json(view) = get_me(State(state), AuthUser(user.id)).await.unwrap();
        assert_eq!(view.email, "a@x.com");
        assert!(view.google_linked);
        assert!(!view.has_password);
        assert!(view.email_verified.is_some());

        let json = serde_json::to_value(&view).unwrap();
        assert!(json["email_verified"].is_string());
    }

    #[tokio::test]
    async fn me_for_unknown_user_is_unauthorized() {
        let err = get_me(State(AppState::fake()), AuthUser(uuid::Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn change_email_without_body_asks_for_email() {
        let err = change_email(State(AppState::fake()), AuthUser(uuid::Uuid::new_v4()), None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Email is required");
    }

    #[tokio::test]
    async fn set_password_without_password_is_rejected() {
        let err = set_password(State(AppState::fake()), AuthUser(uuid::Uuid::new_v4()), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Password is required");
    }
}
