use chrono::Utc;
use cohort_core::payment::{PaymentError, PaymentState, PaymentStatus};
use cohort_core::CoreError;
use cohort_shared::models::events::PaymentStatusChangedEvent;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::BundleRegistration;
use crate::notify::NotificationDispatcher;
use crate::repository::RegistrationRepository;

/// Operator-side payment bookkeeping for bundle registrations.
#[derive(Clone)]
pub struct PaymentLedger {
    repo: Arc<dyn RegistrationRepository>,
    notifications: Option<NotificationDispatcher>,
}

impl PaymentLedger {
    pub fn new(repo: Arc<dyn RegistrationRepository>) -> Self {
        Self {
            repo,
            notifications: None,
        }
    }

    pub fn with_notifications(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.notifications = Some(dispatcher);
        self
    }

    /// Move a registration to `new_status`. `paid` requires a non-negative
    /// amount and stamps the payment date; the other statuses clear both.
    /// Seat counters are never touched.
    pub async fn set_payment_status(
        &self,
        registration_id: Uuid,
        new_status: PaymentStatus,
        amount_paid: Option<i64>,
    ) -> Result<BundleRegistration, LedgerError> {
        let next = PaymentState::transition(new_status, amount_paid, Utc::now())?;

        let current = self
            .repo
            .get_registration(registration_id)
            .await?
            .ok_or(LedgerError::NotFound(registration_id))?;
        let previous = current.payment_status();

        let updated = self
            .repo
            .update_payment(registration_id, &next)
            .await?
            .ok_or(LedgerError::NotFound(registration_id))?;

        tracing::info!(
            %registration_id,
            from = %previous,
            to = %new_status,
            "Payment status updated"
        );

        if let Some(dispatcher) = &self.notifications {
            dispatcher.payment_changed(PaymentStatusChangedEvent {
                registration_id,
                bundle_id: updated.bundle_id,
                buyer_id: updated.buyer_id.clone(),
                buyer_email: updated.buyer_email.clone(),
                previous_status: previous.to_string(),
                new_status: new_status.to_string(),
                amount_paid: updated.payment.amount_paid(),
                timestamp: Utc::now().timestamp(),
            });
        }

        Ok(updated)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Registration not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    InvalidAmount(#[from] PaymentError),

    #[error(transparent)]
    Storage(#[from] CoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRegistry;
    use crate::models::{BuyerInstructions, EventRegistrationEntry};
    use cohort_catalog::{CatalogRepository, EventRecord, EventStatus};

    async fn seeded() -> (Arc<InMemoryRegistry>, BundleRegistration, EventRecord) {
        let registry = Arc::new(InMemoryRegistry::new());
        let event = EventRecord {
            id: Uuid::new_v4(),
            title: "First aid".to_string(),
            date: Utc::now(),
            location: "Beersheba".to_string(),
            capacity: 5,
            price_nis: 70,
            lifecycle_status: EventStatus::Active,
            registered_count: 0,
        };
        registry.create_event(&event).await.unwrap();

        let registration = BundleRegistration {
            id: Uuid::new_v4(),
            bundle_id: Uuid::new_v4(),
            buyer_id: "buyer-3".to_string(),
            buyer_email: None,
            created_at: Utc::now(),
            payment: PaymentState::Pending,
            amount_due_nis: 250,
            event_registrations: vec![EventRegistrationEntry::registered(event.id)],
            skipped_events: vec![],
            instructions: BuyerInstructions::default(),
        };
        registry.commit(&registration, &[event.id]).await.unwrap();
        (registry, registration, event)
    }

    #[tokio::test]
    async fn paid_records_amount_and_date() {
        let (registry, registration, event) = seeded().await;
        let ledger = PaymentLedger::new(registry.clone());

        let updated = ledger
            .set_payment_status(registration.id, PaymentStatus::Paid, Some(250))
            .await
            .unwrap();
        assert_eq!(updated.payment_status(), PaymentStatus::Paid);
        assert_eq!(updated.payment.amount_paid(), Some(250));
        assert!(updated.payment.payment_date().is_some());

        let reverted = ledger
            .set_payment_status(registration.id, PaymentStatus::Pending, Some(250))
            .await
            .unwrap();
        assert_eq!(reverted.payment, PaymentState::Pending);

        // Payment changes never move seat counters.
        assert_eq!(registry.get_event(event.id).await.unwrap().unwrap().registered_count, 1);
    }

    #[tokio::test]
    async fn rejects_bad_amounts_before_touching_storage() {
        let (registry, registration, _) = seeded().await;
        let ledger = PaymentLedger::new(registry.clone());

        let missing = ledger
            .set_payment_status(registration.id, PaymentStatus::Paid, None)
            .await;
        assert!(matches!(missing, Err(LedgerError::InvalidAmount(PaymentError::MissingAmount))));

        let negative = ledger
            .set_payment_status(registration.id, PaymentStatus::Paid, Some(-1))
            .await;
        assert!(matches!(negative, Err(LedgerError::InvalidAmount(PaymentError::NegativeAmount(-1)))));

        let stored = registry.get_registration(registration.id).await.unwrap().unwrap();
        assert_eq!(stored.payment, PaymentState::Pending);
    }

    #[tokio::test]
    async fn unknown_registration_is_not_found() {
        let (registry, _, _) = seeded().await;
        let ledger = PaymentLedger::new(registry);
        let missing = Uuid::new_v4();
        let result = ledger.set_payment_status(missing, PaymentStatus::Free, None).await;
        assert!(matches!(result, Err(LedgerError::NotFound(id)) if id == missing));
    }
}
