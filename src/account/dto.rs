use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::User;

#[derive(Debug, Deserialize)]
pub struct ChangeEmailRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

/// Account settings as shown on the dashboard.
#[derive(Debug, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub email_verified: Option<OffsetDateTime>,
    pub has_password: bool,
    pub google_linked: bool,
}

impl From<User> for AccountView {
    fn from(u: User) -> Self {
        Self {
            has_password: u.password_hash.is_some(),
            google_linked: u.google_id.is_some(),
            id: u.id,
            email: u.email,
            name: u.name,
            email_verified: u.email_verified,
        }
    }
}
