use async_trait::async_trait;
use cohort_core::notification::{NotificationMessage, Notifier, NotifyError};
use std::time::Duration;

/// Posts each message as JSON to an HTTP mail relay.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        if message.recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        self.client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        tracing::debug!(recipients = message.recipients.len(), subject = %message.subject, "Notification relayed");
        Ok(())
    }
}
