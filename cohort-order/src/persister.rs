use chrono::{DateTime, Utc};
use cohort_catalog::{BundleCatalog, ResolvedBundle};
use cohort_core::identity::BuyerIdentity;
use cohort_core::payment::PaymentState;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::FulfillmentError;
use crate::models::{BundleRegistration, BuyerInstructions};
use crate::planner::{FulfillmentPlan, FulfillmentPlanner};
use crate::repository::{CommitOutcome, RegistrationRepository};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Created(BundleRegistration),
    /// Another request for the same buyer and bundle committed first.
    Existing(BundleRegistration),
}

/// Commits a fulfillment plan: claims every planned seat and writes the
/// registration in one atomic step, replanning conflicted members a bounded
/// number of times.
#[derive(Clone)]
pub struct RegistrationPersister {
    repo: Arc<dyn RegistrationRepository>,
    catalog: BundleCatalog,
    max_attempts: usize,
}

impl RegistrationPersister {
    pub fn new(repo: Arc<dyn RegistrationRepository>, catalog: BundleCatalog, max_attempts: usize) -> Self {
        Self {
            repo,
            catalog,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn persist(
        &self,
        bundle: &mut ResolvedBundle,
        mut plan: FulfillmentPlan,
        buyer: &BuyerIdentity,
        instructions: BuyerInstructions,
        now: DateTime<Utc>,
    ) -> Result<PersistOutcome, FulfillmentError> {
        let bundle_id = bundle.definition.id;
        let registration_id = Uuid::new_v4();

        for attempt in 1..=self.max_attempts {
            let registration = Self::assemble(registration_id, bundle, &plan, buyer, instructions.clone(), now);
            let claims = plan.claims();

            match self.repo.commit(&registration, &claims).await? {
                CommitOutcome::Committed => {
                    tracing::info!(
                        %registration_id,
                        %bundle_id,
                        attempt,
                        registered = registration.event_registrations.len(),
                        skipped = registration.skipped_events.len(),
                        "Bundle registration committed"
                    );
                    return Ok(PersistOutcome::Created(registration));
                }
                CommitOutcome::DuplicateActive(existing) => {
                    tracing::info!(
                        registration_id = %existing.id,
                        %bundle_id,
                        "Concurrent request already registered this buyer"
                    );
                    return Ok(PersistOutcome::Existing(existing));
                }
                CommitOutcome::CapacityConflict(conflicted) => {
                    tracing::warn!(
                        %bundle_id,
                        attempt,
                        conflicted = conflicted.len(),
                        "Capacity conflict while committing bundle registration"
                    );
                    if attempt == self.max_attempts {
                        break;
                    }
                    self.catalog.refresh_events(bundle).await?;
                    plan = FulfillmentPlanner::replan(bundle, &plan, &conflicted)?;
                }
            }
        }

        Err(FulfillmentError::Conflict {
            bundle_id,
            attempts: self.max_attempts,
        })
    }

    fn assemble(
        id: Uuid,
        bundle: &ResolvedBundle,
        plan: &FulfillmentPlan,
        buyer: &BuyerIdentity,
        instructions: BuyerInstructions,
        now: DateTime<Utc>,
    ) -> BundleRegistration {
        let price = bundle.definition.price_nis;
        BundleRegistration {
            id,
            bundle_id: bundle.definition.id,
            buyer_id: buyer.buyer_id.clone(),
            buyer_email: buyer.email.clone(),
            created_at: now,
            payment: PaymentState::initial(price),
            amount_due_nis: price,
            event_registrations: plan.event_registrations(),
            skipped_events: plan.skipped_events(),
            instructions,
        }
    }
}
