use uuid::Uuid;

use crate::event::{EventRecord, EventStatus};

impl EventRecord {
    /// Take one seat. Check and increment happen on the same borrowed record,
    /// so callers holding the record under a lock get an atomic claim.
    pub fn try_claim_seat(&mut self) -> Result<u32, CapacityError> {
        if self.lifecycle_status != EventStatus::Active {
            return Err(CapacityError::NotAllocatable {
                event_id: self.id,
                status: self.lifecycle_status.to_string(),
            });
        }
        if self.registered_count >= self.capacity {
            return Err(CapacityError::Exhausted {
                event_id: self.id,
                capacity: self.capacity,
            });
        }

        self.registered_count += 1;
        Ok(self.remaining_seats())
    }

    /// Give a seat back (used when a multi-event commit is rolled back).
    pub fn release_seat(&mut self) -> Result<(), CapacityError> {
        if self.registered_count == 0 {
            return Err(CapacityError::NothingToRelease(self.id));
        }
        self.registered_count -= 1;
        Ok(())
    }

    /// Share of seats taken, 0.0 for zero-capacity events.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.registered_count as f64 / self.capacity as f64
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CapacityError {
    #[error("Event {event_id} is not open for registration (status {status})")]
    NotAllocatable { event_id: Uuid, status: String },

    #[error("Event {event_id} is full (capacity {capacity})")]
    Exhausted { event_id: Uuid, capacity: u32 },

    #[error("Event {0} has no registered seats to release")]
    NothingToRelease(Uuid),
}
