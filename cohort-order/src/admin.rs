use cohort_catalog::{
    BundleDefinition, BundleStatus, CatalogError, CatalogRepository, EventRecord, EventStatus, NewBundle, NewEvent,
};
use cohort_core::CoreError;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::repository::RegistrationRepository;

#[derive(Debug, Clone, Serialize)]
pub struct EventUtilization {
    pub event: EventRecord,
    pub remaining_seats: u32,
    pub utilization: f64,
}

/// Operator-side catalog maintenance: events, bundle definitions and their
/// publish/lifecycle toggles.
#[derive(Clone)]
pub struct CatalogAdmin {
    catalog: Arc<dyn CatalogRepository>,
    registrations: Arc<dyn RegistrationRepository>,
}

impl CatalogAdmin {
    pub fn new(catalog: Arc<dyn CatalogRepository>, registrations: Arc<dyn RegistrationRepository>) -> Self {
        Self { catalog, registrations }
    }

    pub async fn create_event(&self, input: NewEvent) -> Result<EventRecord, AdminError> {
        let event = EventRecord::create(input)?;
        self.catalog.create_event(&event).await?;
        tracing::info!(event_id = %event.id, capacity = event.capacity, "Event created");
        Ok(event)
    }

    pub async fn set_event_status(&self, id: Uuid, status: EventStatus) -> Result<EventRecord, AdminError> {
        let event = self
            .catalog
            .update_event_status(id, status)
            .await?
            .ok_or(AdminError::EventNotFound(id))?;
        tracing::info!(event_id = %id, %status, "Event status changed");
        Ok(event)
    }

    pub async fn event_utilization(&self, id: Uuid) -> Result<EventUtilization, AdminError> {
        let event = self
            .catalog
            .get_event(id)
            .await?
            .ok_or(AdminError::EventNotFound(id))?;
        Ok(EventUtilization {
            remaining_seats: event.remaining_seats(),
            utilization: event.utilization(),
            event,
        })
    }

    pub async fn list_bundles(&self) -> Result<Vec<BundleDefinition>, AdminError> {
        Ok(self.catalog.list_bundles().await?)
    }

    pub async fn create_bundle(&self, input: NewBundle) -> Result<BundleDefinition, AdminError> {
        let bundle = BundleDefinition::create(input)?;
        self.ensure_events_exist(&bundle).await?;
        self.catalog.save_bundle(&bundle).await?;
        tracing::info!(bundle_id = %bundle.id, members = bundle.event_ids.len(), "Bundle created");
        Ok(bundle)
    }

    /// Replace a bundle's content. Refused once any registration references it.
    pub async fn redefine_bundle(&self, id: Uuid, input: NewBundle) -> Result<BundleDefinition, AdminError> {
        let current = self
            .catalog
            .get_bundle(id)
            .await?
            .ok_or(AdminError::BundleNotFound(id))?;

        if !self.registrations.list_for_bundle(id).await?.is_empty() {
            return Err(AdminError::BundleLocked(id));
        }

        let bundle = current.redefine(input)?;
        self.ensure_events_exist(&bundle).await?;
        self.catalog.save_bundle(&bundle).await?;
        Ok(bundle)
    }

    pub async fn set_bundle_status(
        &self,
        id: Uuid,
        publish: bool,
        status: BundleStatus,
    ) -> Result<BundleDefinition, AdminError> {
        let bundle = self
            .catalog
            .update_bundle_status(id, publish, status)
            .await?
            .ok_or(AdminError::BundleNotFound(id))?;
        tracing::info!(bundle_id = %id, publish, %status, "Bundle status changed");
        Ok(bundle)
    }

    async fn ensure_events_exist(&self, bundle: &BundleDefinition) -> Result<(), AdminError> {
        let ids = bundle.all_event_ids();
        let found: HashSet<Uuid> = self.catalog.get_events(&ids).await?.into_iter().map(|e| e.id).collect();
        match ids.iter().find(|id| !found.contains(id)) {
            Some(missing) => Err(AdminError::Catalog(CatalogError::InvalidBundle(format!(
                "event {} does not exist",
                missing
            )))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Bundle not found: {0}")]
    BundleNotFound(Uuid),

    #[error("Event not found: {0}")]
    EventNotFound(Uuid),

    #[error("Bundle {0} already has registrations; only publish and status can change")]
    BundleLocked(Uuid),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Storage(#[from] CoreError),
}
