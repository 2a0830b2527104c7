use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        password::{check_password_shape, hash_password},
        services::{is_valid_email, normalize_email},
    },
    error::AppError,
    state::AppState,
    users::{StoreError, User},
    verification::services::{new_token, send_verification_email},
};

const EMAIL_IN_USE: &str = "Email is already in use";

/// Move the account to `new_email`, unverified, and mail a fresh link.
pub async fn change_email(
    state: &AppState,
    user_id: Uuid,
    new_email: &str,
) -> Result<(), AppError> {
    let email = normalize_email(new_email);
    if email.is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(user_id = %user_id, email = %email, "email change to address in use");
        return Err(AppError::Conflict(EMAIL_IN_USE.into()));
    }

    let token = new_token(state);
    match state.users.set_pending_email(user_id, &email, &token).await {
        Ok(()) => {}
        Err(StoreError::Duplicate) => return Err(AppError::Conflict(EMAIL_IN_USE.into())),
        Err(StoreError::Other(e)) => return Err(e.into()),
    }
    info!(user_id = %user_id, email = %email, "email changed, awaiting verification");

    send_verification_email(state, &email, &token).await?;
    Ok(())
}

pub async fn set_password(
    state: &AppState,
    user_id: Uuid,
    password: &str,
    confirm: Option<&str>,
) -> Result<(), AppError> {
    if confirm.is_some_and(|c| c != password) {
        return Err(AppError::validation("Passwords do not match"));
    }
    check_password_shape(password)?;

    let hash = hash_password(password)?;
    state.users.set_password_hash(user_id, &hash).await?;
    info!(user_id = %user_id, "password set");
    Ok(())
}

/// The session's account; a session for a vanished user is treated as signed out.
pub async fn current_user(state: &AppState, user_id: Uuid) -> Result<User, AppError> {
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthorized)
}
