use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::google::GoogleProfile;
use super::password::{check_password_shape, hash_password, verify_password};
use crate::{
    error::AppError,
    state::AppState,
    users::{NewUser, StoreError, User},
    verification::services::{new_token, send_verification_email},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The two ways a user can prove who they are.
pub enum Credentials {
    Password { email: String, password: String },
    Google(GoogleProfile),
}

/// Resolve credentials to an account, creating or linking it on first sight.
pub async fn authenticate(state: &AppState, credentials: Credentials) -> Result<User, AppError> {
    match credentials {
        Credentials::Password { email, password } => {
            sign_in_with_password(state, &email, &password).await
        }
        Credentials::Google(profile) => sign_in_with_google(state, profile).await,
    }
}

#[instrument(skip(state, password))]
async fn sign_in_with_password(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    check_password_shape(password)?;

    let Some(user) = state.users.find_by_email(&email).await? else {
        return register_pending(state, &email, password).await;
    };

    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "password sign-in on google-only account");
        return Err(AppError::ProviderMismatch);
    };

    if !user.is_verified() {
        warn!(user_id = %user.id, "sign-in before email verification");
        return Err(AppError::Unverified);
    }

    if !verify_password(password, hash)? {
        warn!(user_id = %user.id, "invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user signed in with password");
    Ok(user)
}

/// First password sign-in for an address: create the unverified account,
/// mail the link, and refuse the session until the link is used.
async fn register_pending(state: &AppState, email: &str, password: &str) -> Result<User, AppError> {
    let hash = hash_password(password)?;
    let token = new_token(state);

    let user = match state
        .users
        .create(NewUser {
            email: email.to_string(),
            password_hash: Some(hash),
            verify_token: Some(token.clone()),
            ..Default::default()
        })
        .await
    {
        Ok(u) => u,
        // Lost a race with another signup for the same address.
        Err(StoreError::Duplicate) => return Err(AppError::Unverified),
        Err(StoreError::Other(e)) => return Err(e.into()),
    };
    info!(user_id = %user.id, email = %user.email, "user registered, awaiting verification");

    send_verification_email(state, &user.email, &token).await?;
    Err(AppError::VerificationSent)
}

#[instrument(skip(state, profile), fields(sub = %profile.sub))]
async fn sign_in_with_google(state: &AppState, profile: GoogleProfile) -> Result<User, AppError> {
    let email = normalize_email(&profile.email);

    if let Some(user) = state.users.find_by_google_id(&profile.sub).await? {
        info!(user_id = %user.id, "user signed in with google");
        return Ok(user);
    }

    // Linking and creating both trust Google's ownership check of the address.
    if !profile.verified_email {
        warn!(email = %email, "google email not verified");
        return Err(AppError::validation("Your Google email address is not verified"));
    }

    match state.users.find_by_email(&email).await? {
        Some(user) if user.google_id.is_none() => {
            let user = state
                .users
                .link_google(user.id, &profile.sub, OffsetDateTime::now_utc())
                .await?;
            info!(user_id = %user.id, "google account linked");
            Ok(user)
        }
        Some(user) => {
            // Address already bound to a different Google subject; keep the existing link.
            warn!(user_id = %user.id, "google subject differs from linked account");
            Ok(user)
        }
        None => {
            let user = state
                .users
                .create(NewUser {
                    email,
                    name: profile.name,
                    google_id: Some(profile.sub),
                    email_verified: Some(OffsetDateTime::now_utc()),
                    ..Default::default()
                })
                .await
                .map_err(|e| {
                    AppError::internal("Failed to create account", anyhow::Error::new(e))
                })?;
            info!(user_id = %user.id, email = %user.email, "user registered with google");
            Ok(user)
        }
    }
}
