//! SMTP mail transport
//!
//! Authenticated SMTPS (implicit TLS, port 465 by default) using the
//! service address both as sender and as login name, matching the app-
//! password setup the deployment uses.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{EmailMessage, Mailer, NotifyError};

/// Mailer backed by an authenticated SMTPS relay.
#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    /// Build a transport for `server:port` authenticating as `sender`.
    pub fn new(
        server: &str,
        port: u16,
        sender: &str,
        app_password: &str,
    ) -> Result<Self, NotifyError> {
        let sender: Mailbox = sender
            .parse()
            .map_err(|_| NotifyError::Address(sender.to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(server)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(port)
            .credentials(SmtpCredentials::new(
                sender.email.to_string(),
                app_password.to_string(),
            ))
            .build();

        Ok(Self { transport, sender })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        if message.recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &message.recipients {
            let mailbox: Mailbox = recipient
                .parse()
                .map_err(|_| NotifyError::Address(recipient.clone()))?;
            builder = builder.to(mailbox);
        }

        let mail = builder
            .body(message.body.clone())
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        self.transport
            .send(mail)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sender_address_is_rejected() {
        let err = SmtpMailer::new("smtp.gmail.com", 465, "not-an-address", "pw").unwrap_err();
        assert!(matches!(err, NotifyError::Address(_)));
    }

    #[test]
    fn test_valid_sender_builds() {
        assert!(SmtpMailer::new("smtp.gmail.com", 465, "bot@example.com", "pw").is_ok());
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected_before_transport() {
        let mailer = SmtpMailer::new("smtp.gmail.com", 465, "bot@example.com", "pw").unwrap();
        let message = EmailMessage {
            subject: "s".to_string(),
            body: "b".to_string(),
            recipients: vec!["%%bad%%".to_string()],
        };

        let err = mailer.send(&message).await.unwrap_err();
        assert!(matches!(err, NotifyError::Address(_)));
    }
}
