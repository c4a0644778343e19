use cohort_catalog::CatalogError;
use cohort_core::CoreError;
use uuid::Uuid;

use crate::planner::PlanningFault;

#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Capacity conflict on bundle {bundle_id} after {attempts} attempts")]
    Conflict { bundle_id: Uuid, attempts: usize },

    #[error("Internal consistency fault: {0}")]
    Planning(#[from] PlanningFault),

    #[error(transparent)]
    Storage(#[from] CoreError),
}
