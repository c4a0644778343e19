use serde::{Deserialize, Serialize};

use crate::event::{EventRecord, EventStatus};

/// How allocatable an event is right now.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Active,
    Full,
    Completed,
    Cancelled,
}

/// Classifies events from their current counters. Pure: callers must re-read
/// the record right before committing, and the commit re-checks capacity.
pub struct EventAvailabilityResolver;

impl EventAvailabilityResolver {
    pub fn classify(event: &EventRecord) -> Availability {
        match event.lifecycle_status {
            EventStatus::Active if event.registered_count < event.capacity => Availability::Active,
            EventStatus::Active => Availability::Full,
            EventStatus::Completed => Availability::Completed,
            EventStatus::Cancelled | EventStatus::Draft => Availability::Cancelled,
        }
    }

    /// An event id that no longer resolves to a record is treated as cancelled.
    pub fn classify_resolved(event: Option<&EventRecord>) -> Availability {
        event.map(Self::classify).unwrap_or(Availability::Cancelled)
    }
}
