use std::sync::Mutex;

use async_trait::async_trait;

use super::{MailError, Mailer, OutgoingEmail};

/// Test mailer that keeps every message, or fails every send when `failing`.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Pull the `token` query parameter out of the last verification link sent.
    pub fn last_token(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let text = &sent.last()?.text;
        let start = text.find("token=")? + "token=".len();
        Some(
            text[start..]
                .chars()
                .take_while(|c| c.is_ascii_hexdigit())
                .collect(),
        )
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.failing {
            return Err(MailError::SendFailed("connection refused".into()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}
