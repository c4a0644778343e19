use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::bundle::{BundleDefinition, BundleStatus};
use crate::catalog::CatalogError;
use crate::repository::CatalogRepository;

/// Moves active bundles past their `valid_until` to `expired`.
///
/// Purchases already reject such bundles on their own; the sweep keeps the
/// stored lifecycle status honest for operators.
pub struct BundleExpirySweeper {
    repo: Arc<dyn CatalogRepository>,
}

impl BundleExpirySweeper {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo }
    }

    pub fn due_for_expiry(bundles: &[BundleDefinition], now: DateTime<Utc>) -> Vec<Uuid> {
        bundles
            .iter()
            .filter(|b| b.lifecycle_status == BundleStatus::Active && b.is_expired_at(now))
            .map(|b| b.id)
            .collect()
    }

    /// Returns how many bundles were expired.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, CatalogError> {
        let bundles = self.repo.list_bundles().await?;
        let due = Self::due_for_expiry(&bundles, now);

        // The listing may be stale; the conditional write skips bundles an
        // operator changed in the meantime.
        let mut expired = 0;
        for id in due {
            if self.repo.expire_if_active(id).await? {
                tracing::info!(bundle_id = %id, "Bundle expired");
                expired += 1;
            }
        }

        Ok(expired)
    }
}
