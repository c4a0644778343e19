pub mod admin;
pub mod error;
pub mod idempotency;
pub mod ledger;
pub mod memory;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod persister;
pub mod planner;
pub mod repository;

pub use admin::{AdminError, CatalogAdmin, EventUtilization};
pub use error::FulfillmentError;
pub use idempotency::IdempotencyGuard;
pub use ledger::{LedgerError, PaymentLedger};
pub use memory::InMemoryRegistry;
pub use models::{
    BundleRegistration, BuyerInstructions, EventRegistrationEntry, RegistrationOutcome, SkipReason,
    SkippedEventEntry,
};
pub use notify::NotificationDispatcher;
pub use orchestrator::{FulfillmentReceipt, FulfillmentService, FulfillmentSettings};
pub use persister::{PersistOutcome, RegistrationPersister};
pub use planner::{FulfillmentPlan, FulfillmentPlanner, PlanningFault};
pub use repository::{CommitOutcome, RegistrationRepository};
