use async_trait::async_trait;
use cohort_core::payment::PaymentState;
use cohort_core::CoreResult;
use uuid::Uuid;

use crate::models::BundleRegistration;

/// Result of trying to persist a registration together with its seat claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// These events had no seat left (or stopped being active). Nothing was
    /// written.
    CapacityConflict(Vec<Uuid>),
    /// A concurrent request from the same buyer won. Nothing was written.
    DuplicateActive(BundleRegistration),
}

/// Storage for bundle registrations.
///
/// `commit` is the only way seat counters move: it must increment every
/// claimed event and insert the registration atomically, or do neither.
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn find_active(&self, buyer_id: &str, bundle_id: Uuid) -> CoreResult<Option<BundleRegistration>>;

    async fn get_registration(&self, id: Uuid) -> CoreResult<Option<BundleRegistration>>;

    async fn list_for_bundle(&self, bundle_id: Uuid) -> CoreResult<Vec<BundleRegistration>>;

    async fn commit(&self, registration: &BundleRegistration, claims: &[Uuid]) -> CoreResult<CommitOutcome>;

    /// Overwrite the payment columns. Returns `None` if the registration does
    /// not exist.
    async fn update_payment(&self, id: Uuid, payment: &PaymentState) -> CoreResult<Option<BundleRegistration>>;
}
