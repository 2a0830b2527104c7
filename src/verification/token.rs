use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};

/// Number of random bytes in a verification token (hex-encoded to 64 chars).
pub const TOKEN_BYTES: usize = 32;

/// Opaque email-verification token and the instant it stops being accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationToken {
    pub value: String,
    pub expires_at: OffsetDateTime,
}

impl VerificationToken {
    pub fn issue(ttl: Duration) -> Self {
        Self::issue_at(OffsetDateTime::now_utc(), ttl)
    }

    pub fn issue_at(now: OffsetDateTime, ttl: Duration) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self {
            value: hex::encode(bytes),
            expires_at: now + ttl,
        }
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for VerificationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// `<app-base-url>/verify-email?token=<token>`
pub fn verification_link(app_url: &str, token: &str) -> String {
    format!("{}/verify-email?token={}", app_url.trim_end_matches('/'), token)
}
