use chrono::{DateTime, Utc};
use cohort_core::CoreError;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::availability::{Availability, EventAvailabilityResolver};
use crate::bundle::{BundleDefinition, BundleStatus};
use crate::event::EventRecord;
use crate::repository::CatalogRepository;

/// A purchasable bundle together with the current state of every event it
/// references (members and replacement pool).
#[derive(Debug, Clone)]
pub struct ResolvedBundle {
    pub definition: BundleDefinition,
    pub events: HashMap<Uuid, EventRecord>,
}

impl ResolvedBundle {
    pub fn availability(&self, id: &Uuid) -> Availability {
        EventAvailabilityResolver::classify_resolved(self.events.get(id))
    }
}

/// Read side of the bundle catalog used by the fulfillment flow.
#[derive(Clone)]
pub struct BundleCatalog {
    repo: Arc<dyn CatalogRepository>,
}

impl BundleCatalog {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo }
    }

    /// Load a bundle for purchase at `now` and resolve all its events.
    pub async fn load(&self, bundle_id: Uuid, now: DateTime<Utc>) -> Result<ResolvedBundle, CatalogError> {
        let definition = self
            .repo
            .get_bundle(bundle_id)
            .await?
            .ok_or(CatalogError::NotFound(bundle_id))?;

        Self::check_purchasable(&definition, now)?;

        let events = self.fetch_events(&definition).await?;

        if !definition.event_ids.iter().any(|id| events.contains_key(id)) {
            return Err(CatalogError::EmptyBundle(bundle_id));
        }

        let missing = definition
            .event_ids
            .iter()
            .filter(|id| !events.contains_key(id))
            .count();
        if missing > 0 {
            tracing::warn!(%bundle_id, missing, "Bundle references events that no longer exist");
        }

        Ok(ResolvedBundle { definition, events })
    }

    /// Re-read every event of an already loaded bundle. Used after a capacity
    /// conflict so the next plan sees fresh counters.
    pub async fn refresh_events(&self, resolved: &mut ResolvedBundle) -> Result<(), CatalogError> {
        resolved.events = self.fetch_events(&resolved.definition).await?;
        Ok(())
    }

    pub fn check_purchasable(bundle: &BundleDefinition, now: DateTime<Utc>) -> Result<(), CatalogError> {
        if !bundle.publish || bundle.lifecycle_status != BundleStatus::Active {
            return Err(CatalogError::Unavailable(bundle.id));
        }
        if bundle.is_expired_at(now) {
            return Err(CatalogError::Expired(bundle.id));
        }
        Ok(())
    }

    async fn fetch_events(&self, definition: &BundleDefinition) -> Result<HashMap<Uuid, EventRecord>, CatalogError> {
        let ids = definition.all_event_ids();
        let events = self.repo.get_events(&ids).await?;
        Ok(events.into_iter().map(|e| (e.id, e)).collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Bundle not found: {0}")]
    NotFound(Uuid),

    #[error("Bundle is not available for purchase: {0}")]
    Unavailable(Uuid),

    #[error("Bundle has expired: {0}")]
    Expired(Uuid),

    #[error("None of the bundle's events exist: {0}")]
    EmptyBundle(Uuid),

    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error(transparent)]
    Storage(#[from] CoreError),
}
