use chrono::Utc;
use cohort_catalog::{BundleCatalog, CatalogRepository};
use cohort_core::identity::BuyerIdentity;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::FulfillmentError;
use crate::idempotency::IdempotencyGuard;
use crate::models::{BundleRegistration, BuyerInstructions};
use crate::notify::{registered_event, NotificationDispatcher};
use crate::persister::{PersistOutcome, RegistrationPersister};
use crate::planner::FulfillmentPlanner;
use crate::repository::RegistrationRepository;

#[derive(Debug, Clone)]
pub struct FulfillmentSettings {
    pub max_commit_attempts: usize,
    pub instructions_max_len: usize,
}

impl Default for FulfillmentSettings {
    fn default() -> Self {
        Self {
            max_commit_attempts: 3,
            instructions_max_len: 2_000,
        }
    }
}

/// What a register-bundle call hands back. `replayed` is true when the buyer
/// already held an active registration and nothing new was fulfilled.
#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentReceipt {
    pub registration: BundleRegistration,
    pub replayed: bool,
}

/// Turns one purchase request into a committed bundle registration.
#[derive(Clone)]
pub struct FulfillmentService {
    catalog: BundleCatalog,
    guard: IdempotencyGuard,
    persister: RegistrationPersister,
    registrations: Arc<dyn RegistrationRepository>,
    notifications: Option<NotificationDispatcher>,
    settings: FulfillmentSettings,
}

impl FulfillmentService {
    pub fn new(
        catalog_repo: Arc<dyn CatalogRepository>,
        registrations: Arc<dyn RegistrationRepository>,
        settings: FulfillmentSettings,
    ) -> Self {
        let catalog = BundleCatalog::new(catalog_repo);
        Self {
            guard: IdempotencyGuard::new(registrations.clone()),
            persister: RegistrationPersister::new(registrations.clone(), catalog.clone(), settings.max_commit_attempts),
            catalog,
            registrations,
            notifications: None,
            settings,
        }
    }

    pub fn with_notifications(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.notifications = Some(dispatcher);
        self
    }

    #[tracing::instrument(skip(self, buyer, instructions), fields(buyer_id = %buyer.buyer_id))]
    pub async fn register_bundle(
        &self,
        buyer: &BuyerIdentity,
        bundle_id: Uuid,
        instructions: BuyerInstructions,
    ) -> Result<FulfillmentReceipt, FulfillmentError> {
        let instructions = instructions
            .normalized(self.settings.instructions_max_len)
            .map_err(FulfillmentError::Validation)?;

        if let Some(existing) = self.guard.existing(&buyer.buyer_id, bundle_id).await? {
            return Ok(FulfillmentReceipt {
                registration: existing,
                replayed: true,
            });
        }

        let now = Utc::now();
        let mut bundle = self.catalog.load(bundle_id, now).await?;
        let plan = FulfillmentPlanner::plan(&bundle)?;

        let outcome = self
            .persister
            .persist(&mut bundle, plan, buyer, instructions, now)
            .await?;

        match outcome {
            PersistOutcome::Created(registration) => {
                if let Some(dispatcher) = &self.notifications {
                    dispatcher.registration_confirmed(registered_event(&bundle.definition.title, &registration));
                }
                Ok(FulfillmentReceipt {
                    registration,
                    replayed: false,
                })
            }
            PersistOutcome::Existing(registration) => Ok(FulfillmentReceipt {
                registration,
                replayed: true,
            }),
        }
    }

    /// The buyer's active registration for a bundle, without side effects.
    pub async fn existing_registration(
        &self,
        buyer_id: &str,
        bundle_id: Uuid,
    ) -> Result<Option<BundleRegistration>, FulfillmentError> {
        Ok(self.guard.existing(buyer_id, bundle_id).await?)
    }

    pub async fn registration(&self, id: Uuid) -> Result<Option<BundleRegistration>, FulfillmentError> {
        Ok(self.registrations.get_registration(id).await?)
    }

    pub async fn registrations_for_bundle(&self, bundle_id: Uuid) -> Result<Vec<BundleRegistration>, FulfillmentError> {
        Ok(self.registrations.list_for_bundle(bundle_id).await?)
    }
}
