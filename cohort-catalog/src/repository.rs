use async_trait::async_trait;
use cohort_core::CoreResult;
use uuid::Uuid;

use crate::bundle::{BundleDefinition, BundleStatus};
use crate::event::{EventRecord, EventStatus};

/// Read/write access to bundle definitions and event records.
///
/// Event writes never touch `registered_count`; seat counters only move through
/// a registration commit.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_bundle(&self, id: Uuid) -> CoreResult<Option<BundleDefinition>>;

    async fn list_bundles(&self) -> CoreResult<Vec<BundleDefinition>>;

    /// Insert or fully replace a bundle definition.
    async fn save_bundle(&self, bundle: &BundleDefinition) -> CoreResult<()>;

    /// Flip only the publish flag and lifecycle status. Returns the updated
    /// bundle, or `None` if it does not exist.
    async fn update_bundle_status(
        &self,
        id: Uuid,
        publish: bool,
        status: BundleStatus,
    ) -> CoreResult<Option<BundleDefinition>>;

    /// Move a bundle to `expired` only if it is still `active`. The publish
    /// flag is left alone. Returns whether a row changed.
    async fn expire_if_active(&self, id: Uuid) -> CoreResult<bool>;

    /// Fetch the events that exist among `ids`. Missing ids are simply absent
    /// from the result.
    async fn get_events(&self, ids: &[Uuid]) -> CoreResult<Vec<EventRecord>>;

    async fn get_event(&self, id: Uuid) -> CoreResult<Option<EventRecord>> {
        Ok(self.get_events(&[id]).await?.into_iter().next())
    }

    async fn create_event(&self, event: &EventRecord) -> CoreResult<()>;

    async fn update_event_status(&self, id: Uuid, status: EventStatus) -> CoreResult<Option<EventRecord>>;
}
