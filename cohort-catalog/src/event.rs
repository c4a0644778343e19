use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::catalog::CatalogError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Active,
    Completed,
    Cancelled,
    Draft,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Draft => "draft",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EventStatus::Active),
            "completed" => Ok(EventStatus::Completed),
            "cancelled" => Ok(EventStatus::Cancelled),
            "draft" => Ok(EventStatus::Draft),
            other => Err(CatalogError::UnknownStatus(other.to_string())),
        }
    }
}

/// A single training event that bundles point at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub capacity: u32,
    pub price_nis: i64,
    pub lifecycle_status: EventStatus,
    /// Seats already taken. Never exceeds `capacity` while the event is active.
    pub registered_count: u32,
}

/// Operator input for a new event.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub capacity: u32,
    pub price_nis: i64,
    #[serde(default = "default_event_status")]
    pub lifecycle_status: EventStatus,
}

fn default_event_status() -> EventStatus {
    EventStatus::Draft
}

impl EventRecord {
    pub fn create(input: NewEvent) -> Result<Self, CatalogError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(CatalogError::InvalidEvent("title is required".to_string()));
        }
        if input.price_nis < 0 {
            return Err(CatalogError::InvalidEvent(format!(
                "price must not be negative: {}",
                input.price_nis
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            title,
            date: input.date,
            location: input.location.trim().to_string(),
            capacity: input.capacity,
            price_nis: input.price_nis,
            lifecycle_status: input.lifecycle_status,
            registered_count: 0,
        })
    }

    pub fn remaining_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.registered_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_defaults_to_draft_with_no_seats_taken() {
        let input: NewEvent = serde_json::from_value(serde_json::json!({
            "title": "  First Aid Basics ",
            "date": "2026-11-02T08:00:00Z",
            "location": "Haifa",
            "capacity": 12,
            "price_nis": 250
        }))
        .unwrap();

        let event = EventRecord::create(input).unwrap();
        assert_eq!(event.title, "First Aid Basics");
        assert_eq!(event.lifecycle_status, EventStatus::Draft);
        assert_eq!(event.registered_count, 0);
        assert_eq!(event.remaining_seats(), 12);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [EventStatus::Active, EventStatus::Completed, EventStatus::Cancelled, EventStatus::Draft] {
            assert_eq!(status.as_str().parse::<EventStatus>().unwrap(), status);
        }
        assert!("archived".parse::<EventStatus>().is_err());
    }
}
