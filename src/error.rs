use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Every failure a handler can surface. The `Display` text of each variant is
/// what the client sees in `{"error": ...}`, so it must stay user-safe.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid verification token")]
    InvalidToken,

    #[error("Verification token has expired")]
    TokenExpired,

    #[error("Invalid password")]
    InvalidCredentials,

    #[error("Please verify your email before signing in.")]
    Unverified,

    #[error("Please check your email to verify your account.")]
    VerificationSent,

    #[error("This email is registered with Google. Please sign in with Google.")]
    ProviderMismatch,

    #[error("{public}")]
    Internal {
        public: &'static str,
        cause: anyhow::Error,
    },
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(public: &'static str, cause: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            public,
            cause: cause.into(),
        }
    }

    /// Replaces the public message of an `Internal` error; other variants pass through.
    pub fn public_message(self, public: &'static str) -> Self {
        match self {
            Self::Internal { cause, .. } => Self::Internal { public, cause },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::Conflict(_)
            | Self::InvalidToken
            | Self::TokenExpired => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Unverified | Self::VerificationSent => StatusCode::FORBIDDEN,
            Self::ProviderMismatch => StatusCode::CONFLICT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(cause: anyhow::Error) -> Self {
        Self::internal("Internal server error", cause)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Internal { public, cause } = &self {
            error!(error = ?cause, public = %public, "internal error");
        }
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
