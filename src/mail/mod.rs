//! Outbound mail. Handlers only see the [`Mailer`] trait; production wires
//! [`smtp::SmtpMailer`], tests a recording double.

#[cfg(test)]
pub mod recording;
pub mod smtp;
mod templates;

pub use templates::VerificationEmail;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid mail configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("failed to send email: {0}")]
    SendFailed(String),
}

/// A rendered message ready for a transport.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}
