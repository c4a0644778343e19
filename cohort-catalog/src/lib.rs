pub mod availability;
pub mod bundle;
pub mod capacity;
pub mod catalog;
pub mod event;
pub mod expiry;
pub mod repository;

pub use availability::{Availability, EventAvailabilityResolver};
pub use bundle::{BundleDefinition, BundleStatus, NewBundle};
pub use catalog::{BundleCatalog, CatalogError, ResolvedBundle};
pub use event::{EventRecord, EventStatus, NewEvent};
pub use repository::CatalogRepository;
