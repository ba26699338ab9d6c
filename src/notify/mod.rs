//! Notification delivery
//!
//! Delivery is best-effort by policy: a transport failure is logged and
//! reported through [`DeliveryStatus`], never propagated as a cycle error.
//! The concrete SMTP transport lives behind the [`Mailer`] trait so tests
//! can observe outgoing mail without a mail server.

pub mod smtp;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use smtp::SmtpMailer;

/// Fixed subject line of every availability notification.
pub const SUBJECT: &str = "CERTIPORT VIZSGAÉRTESÍTÉS";

/// Signature appended to every outgoing body.
pub const SIGNATURE: &str = "CERTIPORT BOT";

/// One outgoing plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

/// Errors that can occur during mail transport
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("SMTP transport failed: {0}")]
    Transport(String),

    #[error("invalid mail address {0:?}")]
    Address(String),

    #[error("message could not be built: {0}")]
    Build(String),

    #[error("empty recipient list")]
    NoRecipients,
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone)]
pub struct DeliveryStatus {
    /// Whether the message was handed to the transport successfully
    pub success: bool,
    /// Number of addressed recipients
    pub recipients: usize,
    /// Failure detail, when there is one
    pub message: Option<String>,
    /// Timestamp of the delivery attempt
    pub timestamp: DateTime<Utc>,
}

impl DeliveryStatus {
    pub fn success(recipients: usize) -> Self {
        Self {
            success: true,
            recipients,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(recipients: usize, message: impl Into<String>) -> Self {
        Self {
            success: false,
            recipients,
            message: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.success { "SENT" } else { "FAILED" };
        write!(f, "[{status}] {} recipient(s)", self.recipients)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// Trait for mail transports
///
/// Implement this to route notifications through a different channel.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Mailer that discards every message; used where delivery is not wanted
/// (e.g. the read-only `report` command).
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Formats and dispatches notification mail to the configured recipients.
pub struct Notifier<M> {
    mailer: M,
    recipients: Vec<String>,
}

impl<M: Mailer> Notifier<M> {
    pub fn new(mailer: M, recipients: Vec<String>) -> Self {
        Self { mailer, recipients }
    }

    /// Send `body` to the configured recipient list.
    pub async fn notify(&self, body: &str) -> DeliveryStatus {
        self.notify_to(body, &self.recipients).await
    }

    /// Send `body` to an explicit recipient list (used for the startup
    /// notice, which goes to the service address only).
    pub async fn notify_to(&self, body: &str, recipients: &[String]) -> DeliveryStatus {
        if recipients.is_empty() {
            tracing::warn!("no recipients configured, notification dropped");
            return DeliveryStatus::failure(0, NotifyError::NoRecipients.to_string());
        }

        let message = EmailMessage {
            subject: SUBJECT.to_string(),
            body: format!("{body}\n\n{SIGNATURE}"),
            recipients: recipients.to_vec(),
        };

        match self.mailer.send(&message).await {
            Ok(()) => {
                tracing::debug!(recipients = recipients.len(), "notification delivered");
                DeliveryStatus::success(recipients.len())
            }
            Err(e) => {
                // Best-effort policy: log and carry on, the cycle completes.
                tracing::warn!(error = %e, "notification delivery failed");
                DeliveryStatus::failure(recipients.len(), e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    impl RecordingMailer {
        fn new(fail: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Transport("connection refused".to_string()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_notify_appends_signature_and_subject() {
        let notifier = Notifier::new(
            RecordingMailer::new(false),
            vec!["a@example.com".to_string()],
        );

        let status = notifier.notify("Szabad helyek vannak").await;
        assert!(status.success);
        assert_eq!(status.recipients, 1);

        let sent = notifier.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, SUBJECT);
        assert_eq!(sent[0].body, "Szabad helyek vannak\n\nCERTIPORT BOT");
    }

    #[tokio::test]
    async fn test_transport_failure_is_non_fatal() {
        let notifier = Notifier::new(
            RecordingMailer::new(true),
            vec!["a@example.com".to_string()],
        );

        let status = notifier.notify("body").await;
        assert!(!status.success);
        assert!(status.message.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_empty_recipient_list_is_a_failure_status() {
        let notifier = Notifier::new(RecordingMailer::new(false), Vec::new());
        let status = notifier.notify("body").await;
        assert!(!status.success);
        assert_eq!(status.recipients, 0);
    }

    #[test]
    fn test_delivery_status_display() {
        let ok = DeliveryStatus::success(2);
        assert!(ok.to_string().contains("SENT"));

        let failed = DeliveryStatus::failure(1, "SMTP error");
        assert!(failed.to_string().contains("FAILED"));
        assert!(failed.to_string().contains("SMTP error"));
    }
}
