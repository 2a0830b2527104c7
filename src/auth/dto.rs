use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::User;

/// Request body for email/password sign-in (first use also registers).
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Query string Google appends to the callback redirect.
#[derive(Debug, Deserialize)]
pub struct GoogleCallback {
    pub code: String,
    pub state: String,
}

/// Response returned after sign-in or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone(),
        }
    }
}
