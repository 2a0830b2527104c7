use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::verification::token::VerificationToken;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,     // Argon2 hash, absent for Google-only accounts
    pub google_id: Option<String>,         // OAuth subject
    pub email_verified: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub verify_token: Option<String>,
    pub verify_token_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.email_verified.is_some()
    }
}

/// Insert payload for a new account.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub email_verified: Option<OffsetDateTime>,
    pub verify_token: Option<VerificationToken>,
}

/// Outcome of presenting a verification token to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRedemption {
    Verified(Uuid),
    Expired,
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique column (email, google_id, token) already holds this value.
    #[error("duplicate value for a unique column")]
    Duplicate,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let unique = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
        if unique {
            StoreError::Duplicate
        } else {
            StoreError::Other(e.into())
        }
    }
}
