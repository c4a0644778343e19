use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An outbound email-style message. Delivery is always best-effort.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification transport failed: {0}")]
    Transport(String),

    #[error("Notification has no recipients")]
    NoRecipients,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError>;
}

/// Writes messages to the log instead of delivering them. Used when no relay
/// is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        if message.recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }
        tracing::info!(
            recipients = message.recipients.len(),
            subject = %message.subject,
            "Notification (log only)"
        );
        Ok(())
    }
}
