use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, instrument};

use super::{MailError, Mailer, OutgoingEmail};
use crate::config::SmtpConfig;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|_| MailError::InvalidAddress(config.from.clone()))?;

        let mut builder = if config.secure {
            let tls = TlsParameters::new(config.host.clone())
                .map_err(|e| MailError::InvalidConfig(format!("TLS parameters: {e}")))?;
            // 465 speaks TLS from the first byte, everything else upgrades with STARTTLS
            let tls = if config.port == 465 {
                Tls::Wrapper(tls)
            } else {
                Tls::Required(tls)
            };
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .tls(tls)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: OutgoingEmail) -> Result<Message, MailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|_| MailError::InvalidAddress(email.to.clone()))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html),
                    ),
            )
            .map_err(|e| MailError::SendFailed(format!("build message: {e}")))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, email), fields(to = %email.to))]
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = self.build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::SendFailed(e.to_string()))?;
        debug!("email sent");
        Ok(())
    }
}
