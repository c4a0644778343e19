use std::sync::Arc;
use uuid::Uuid;

use crate::models::BundleRegistration;
use crate::repository::RegistrationRepository;
use cohort_core::CoreResult;

/// Looks up a buyer's active registration for a bundle so a repeated purchase
/// returns the original receipt instead of claiming seats again.
///
/// This is the fast path only. The storage layer's uniqueness constraint on
/// (buyer, bundle) is what actually closes the race between two concurrent
/// first purchases.
#[derive(Clone)]
pub struct IdempotencyGuard {
    repo: Arc<dyn RegistrationRepository>,
}

impl IdempotencyGuard {
    pub fn new(repo: Arc<dyn RegistrationRepository>) -> Self {
        Self { repo }
    }

    pub async fn existing(&self, buyer_id: &str, bundle_id: Uuid) -> CoreResult<Option<BundleRegistration>> {
        let found = self.repo.find_active(buyer_id, bundle_id).await?;
        if let Some(registration) = &found {
            tracing::debug!(
                registration_id = %registration.id,
                %bundle_id,
                "Returning existing bundle registration"
            );
        }
        Ok(found)
    }
}
