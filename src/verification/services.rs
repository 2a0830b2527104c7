use anyhow::Context;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::token::{verification_link, VerificationToken};
use crate::{
    error::AppError,
    mail::VerificationEmail,
    state::AppState,
    users::TokenRedemption,
};

/// Fresh token with the configured lifetime. The caller persists it.
pub fn new_token(state: &AppState) -> VerificationToken {
    VerificationToken::issue(Duration::hours(state.config.verify_token_ttl_hours))
}

/// Mail the verification link for `token` to `to`. The persisted token is
/// left in place when delivery fails.
pub async fn send_verification_email(
    state: &AppState,
    to: &str,
    token: &VerificationToken,
) -> anyhow::Result<()> {
    let link = verification_link(&state.config.app_url, &token.value);
    let email = VerificationEmail::new(&link, state.config.verify_token_ttl_hours).to(to);
    state
        .mailer
        .send(email)
        .await
        .with_context(|| format!("send verification email to {to}"))?;
    info!(email = %to, "verification email sent");
    Ok(())
}

/// Exchange a token for the verified state.
pub async fn redeem(state: &AppState, token: &str) -> Result<Uuid, AppError> {
    redeem_at(state, token, OffsetDateTime::now_utc()).await
}

pub async fn redeem_at(
    state: &AppState,
    token: &str,
    now: OffsetDateTime,
) -> Result<Uuid, AppError> {
    match state.users.redeem_verify_token(token, now).await? {
        TokenRedemption::Verified(user_id) => {
            info!(user_id = %user_id, "email verified");
            Ok(user_id)
        }
        TokenRedemption::Expired => {
            warn!("verification token expired");
            Err(AppError::TokenExpired)
        }
        TokenRedemption::Unknown => {
            warn!("unknown verification token");
            Err(AppError::InvalidToken)
        }
    }
}
