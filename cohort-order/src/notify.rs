use cohort_core::notification::{NotificationMessage, Notifier};
use cohort_core::retry::RetryPolicy;
use cohort_shared::models::events::{BundleRegisteredEvent, PaymentStatusChangedEvent};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::models::BundleRegistration;

/// Fire-and-forget email side effects of the fulfillment flow.
///
/// Every send runs on its own task with bounded retries. Failures are logged
/// and never reach the caller of the purchase.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    policy: RetryPolicy,
    operator_emails: Vec<String>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, policy: RetryPolicy, operator_emails: Vec<String>) -> Self {
        Self {
            notifier,
            policy,
            operator_emails,
        }
    }

    /// Confirmation to the buyer plus a heads-up to operators.
    /// The handle resolves to the number of messages delivered.
    pub fn registration_confirmed(&self, event: BundleRegisteredEvent) -> JoinHandle<usize> {
        let mut messages = Vec::new();
        if let Some(email) = &event.buyer_email {
            messages.push(NotificationMessage {
                recipients: vec![email.clone()],
                subject: format!("Registration confirmed: {}", event.bundle_title),
                body: buyer_confirmation_body(&event),
            });
        }
        if !self.operator_emails.is_empty() {
            messages.push(NotificationMessage {
                recipients: self.operator_emails.clone(),
                subject: format!("New bundle registration: {}", event.bundle_title),
                body: format!(
                    "Registration {} by buyer {}.\nEvents: {}, replaced: {}, skipped: {}.\nPayment: {} ({} NIS due).",
                    event.registration_id,
                    event.buyer_id,
                    event.registered_event_ids.len(),
                    event.replaced_count,
                    event.skipped_count,
                    event.payment_status,
                    event.amount_due_nis,
                ),
            });
        }
        self.spawn(messages)
    }

    pub fn payment_changed(&self, event: PaymentStatusChangedEvent) -> JoinHandle<usize> {
        let messages = event
            .buyer_email
            .iter()
            .map(|email| NotificationMessage {
                recipients: vec![email.clone()],
                subject: "Your registration payment was updated".to_string(),
                body: match event.amount_paid {
                    Some(amount) => format!(
                        "Registration {} is now {} ({} NIS received).",
                        event.registration_id, event.new_status, amount
                    ),
                    None => format!("Registration {} is now {}.", event.registration_id, event.new_status),
                },
            })
            .collect();
        self.spawn(messages)
    }

    fn spawn(&self, messages: Vec<NotificationMessage>) -> JoinHandle<usize> {
        let notifier = self.notifier.clone();
        let policy = self.policy.clone();
        tokio::spawn(async move {
            let mut delivered = 0;
            for message in &messages {
                if deliver(notifier.as_ref(), &policy, message).await {
                    delivered += 1;
                }
            }
            delivered
        })
    }
}

async fn deliver(notifier: &dyn Notifier, policy: &RetryPolicy, message: &NotificationMessage) -> bool {
    let result = policy
        .retry_async(|attempt| async move {
            let sent = notifier.send(message).await;
            if let Err(e) = &sent {
                tracing::warn!(attempt, subject = %message.subject, error = %e, "Notification attempt failed");
            }
            sent
        })
        .await;

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(subject = %message.subject, error = %e, "Giving up on notification");
            false
        }
    }
}

fn buyer_confirmation_body(event: &BundleRegisteredEvent) -> String {
    let mut body = format!(
        "You are registered for {} event(s) in \"{}\".",
        event.registered_event_ids.len(),
        event.bundle_title
    );
    if event.replaced_count > 0 {
        body.push_str(&format!(
            "\n{} event(s) were replaced with an equivalent session.",
            event.replaced_count
        ));
    }
    if event.skipped_count > 0 {
        body.push_str(&format!(
            "\n{} event(s) could not be offered and are listed on your receipt. The bundle price does not change.",
            event.skipped_count
        ));
    }
    body.push_str(&format!(
        "\nAmount due: {} NIS ({}).",
        event.amount_due_nis, event.payment_status
    ));
    body
}

/// Event payload for a freshly committed registration.
pub fn registered_event(bundle_title: &str, registration: &BundleRegistration) -> BundleRegisteredEvent {
    BundleRegisteredEvent {
        registration_id: registration.id,
        bundle_id: registration.bundle_id,
        bundle_title: bundle_title.to_string(),
        buyer_id: registration.buyer_id.clone(),
        buyer_email: registration.buyer_email.clone(),
        registered_event_ids: registration.attended_event_ids(),
        replaced_count: registration.replaced_count(),
        skipped_count: registration.skipped_events.len(),
        payment_status: registration.payment_status().to_string(),
        amount_due_nis: registration.amount_due_nis,
        timestamp: registration.created_at.timestamp(),
    }
}
