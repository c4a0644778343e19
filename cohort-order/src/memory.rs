use async_trait::async_trait;
use cohort_catalog::{BundleDefinition, BundleStatus, CatalogRepository, EventRecord, EventStatus};
use cohort_core::payment::PaymentState;
use cohort_core::{CoreError, CoreResult};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::BundleRegistration;
use crate::repository::{CommitOutcome, RegistrationRepository};

#[derive(Default)]
struct RegistryState {
    bundles: HashMap<Uuid, BundleDefinition>,
    events: HashMap<Uuid, EventRecord>,
    registrations: Vec<BundleRegistration>,
}

/// Process-local catalog and registration store.
///
/// A single lock covers events and registrations, which makes the
/// claim-and-insert in `commit` atomic. Used when no database is configured
/// and throughout the tests.
#[derive(Default)]
pub struct InMemoryRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRegistry {
    async fn get_bundle(&self, id: Uuid) -> CoreResult<Option<BundleDefinition>> {
        Ok(self.state.lock().await.bundles.get(&id).cloned())
    }

    async fn list_bundles(&self) -> CoreResult<Vec<BundleDefinition>> {
        let state = self.state.lock().await;
        let mut bundles: Vec<_> = state.bundles.values().cloned().collect();
        bundles.sort_by_key(|b| b.created_at);
        Ok(bundles)
    }

    async fn save_bundle(&self, bundle: &BundleDefinition) -> CoreResult<()> {
        self.state.lock().await.bundles.insert(bundle.id, bundle.clone());
        Ok(())
    }

    async fn update_bundle_status(
        &self,
        id: Uuid,
        publish: bool,
        status: BundleStatus,
    ) -> CoreResult<Option<BundleDefinition>> {
        let mut state = self.state.lock().await;
        Ok(state.bundles.get_mut(&id).map(|bundle| {
            bundle.publish = publish;
            bundle.lifecycle_status = status;
            bundle.clone()
        }))
    }

    async fn expire_if_active(&self, id: Uuid) -> CoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.bundles.get_mut(&id) {
            Some(bundle) if bundle.lifecycle_status == BundleStatus::Active => {
                bundle.lifecycle_status = BundleStatus::Expired;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_events(&self, ids: &[Uuid]) -> CoreResult<Vec<EventRecord>> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.events.get(id).cloned()).collect())
    }

    async fn create_event(&self, event: &EventRecord) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state.events.contains_key(&event.id) {
            return Err(CoreError::ValidationError(format!("Event {} already exists", event.id)));
        }
        state.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update_event_status(&self, id: Uuid, status: EventStatus) -> CoreResult<Option<EventRecord>> {
        let mut state = self.state.lock().await;
        Ok(state.events.get_mut(&id).map(|event| {
            event.lifecycle_status = status;
            event.clone()
        }))
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryRegistry {
    async fn find_active(&self, buyer_id: &str, bundle_id: Uuid) -> CoreResult<Option<BundleRegistration>> {
        let state = self.state.lock().await;
        Ok(state
            .registrations
            .iter()
            .find(|r| r.buyer_id == buyer_id && r.bundle_id == bundle_id && r.payment_status().is_active())
            .cloned())
    }

    async fn get_registration(&self, id: Uuid) -> CoreResult<Option<BundleRegistration>> {
        let state = self.state.lock().await;
        Ok(state.registrations.iter().find(|r| r.id == id).cloned())
    }

    async fn list_for_bundle(&self, bundle_id: Uuid) -> CoreResult<Vec<BundleRegistration>> {
        let state = self.state.lock().await;
        Ok(state
            .registrations
            .iter()
            .filter(|r| r.bundle_id == bundle_id)
            .cloned()
            .collect())
    }

    async fn commit(&self, registration: &BundleRegistration, claims: &[Uuid]) -> CoreResult<CommitOutcome> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if let Some(existing) = state.registrations.iter().find(|r| {
            r.buyer_id == registration.buyer_id
                && r.bundle_id == registration.bundle_id
                && r.payment_status().is_active()
        }) {
            return Ok(CommitOutcome::DuplicateActive(existing.clone()));
        }

        let mut claimed = Vec::with_capacity(claims.len());
        let mut conflicted = Vec::new();
        for event_id in claims {
            match state.events.get_mut(event_id) {
                Some(event) => match event.try_claim_seat() {
                    Ok(_) => claimed.push(*event_id),
                    Err(_) => conflicted.push(*event_id),
                },
                None => conflicted.push(*event_id),
            }
        }

        if !conflicted.is_empty() {
            for event_id in &claimed {
                if let Some(event) = state.events.get_mut(event_id) {
                    event.release_seat().map_err(CoreError::storage)?;
                }
            }
            return Ok(CommitOutcome::CapacityConflict(conflicted));
        }

        state.registrations.push(registration.clone());
        Ok(CommitOutcome::Committed)
    }

    async fn update_payment(&self, id: Uuid, payment: &PaymentState) -> CoreResult<Option<BundleRegistration>> {
        let mut state = self.state.lock().await;
        Ok(state.registrations.iter_mut().find(|r| r.id == id).map(|registration| {
            registration.payment = payment.clone();
            registration.clone()
        }))
    }
}
