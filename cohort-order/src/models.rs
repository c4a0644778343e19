use chrono::{DateTime, Utc};
use cohort_catalog::Availability;
use cohort_core::payment::{PaymentState, PaymentStatus};
use cohort_shared::pii::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationOutcome {
    Registered,
    Replaced,
}

/// One bundle member the buyer ends up attending, either as declared or
/// through a replacement event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRegistrationEntry {
    /// Always the original bundle member.
    pub event_id: Uuid,
    pub outcome: RegistrationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_event_id: Option<Uuid>,
}

impl EventRegistrationEntry {
    pub fn registered(event_id: Uuid) -> Self {
        Self {
            event_id,
            outcome: RegistrationOutcome::Registered,
            replacement_event_id: None,
        }
    }

    pub fn replaced(event_id: Uuid, replacement_event_id: Uuid) -> Self {
        Self {
            event_id,
            outcome: RegistrationOutcome::Replaced,
            replacement_event_id: Some(replacement_event_id),
        }
    }

    /// The event whose seat this entry holds.
    pub fn attended_event_id(&self) -> Uuid {
        self.replacement_event_id.unwrap_or(self.event_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Completed,
    Cancelled,
    Full,
    NoReplacementAvailable,
}

impl SkipReason {
    /// Reason for an unavailable member when no replacement was tried.
    /// `None` for events that are still allocatable.
    pub fn for_availability(availability: Availability) -> Option<Self> {
        match availability {
            Availability::Active => None,
            Availability::Full => Some(SkipReason::Full),
            Availability::Completed => Some(SkipReason::Completed),
            Availability::Cancelled => Some(SkipReason::Cancelled),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedEventEntry {
    pub original_event_id: Uuid,
    pub reason: SkipReason,
}

/// Free-text fields the buyer attaches to the whole purchase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuyerInstructions {
    pub pickup: Option<String>,
    pub medical: Option<Masked<String>>,
    pub notes: Option<String>,
}

impl BuyerInstructions {
    /// Trim every field, drop empty ones and enforce the length limit.
    pub fn normalized(self, max_len: usize) -> Result<Self, String> {
        Ok(Self {
            pickup: normalize_field("pickup", self.pickup, max_len)?,
            medical: normalize_field("medical", self.medical.map(Masked::into_inner), max_len)?.map(Masked),
            notes: normalize_field("notes", self.notes, max_len)?,
        })
    }
}

fn normalize_field(name: &str, value: Option<String>, max_len: usize) -> Result<Option<String>, String> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max_len {
        return Err(format!("{} must be at most {} characters", name, max_len));
    }
    Ok(Some(trimmed.to_string()))
}

/// The receipt of one fulfilled bundle purchase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleRegistration {
    pub id: Uuid,
    pub bundle_id: Uuid,
    pub buyer_id: String,
    pub buyer_email: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payment: PaymentState,
    /// The bundle price at purchase time, owed regardless of skips.
    pub amount_due_nis: i64,
    pub event_registrations: Vec<EventRegistrationEntry>,
    pub skipped_events: Vec<SkippedEventEntry>,
    pub instructions: BuyerInstructions,
}

impl BundleRegistration {
    pub fn payment_status(&self) -> PaymentStatus {
        self.payment.status()
    }

    pub fn attended_event_ids(&self) -> Vec<Uuid> {
        self.event_registrations
            .iter()
            .map(EventRegistrationEntry::attended_event_id)
            .collect()
    }

    pub fn replaced_count(&self) -> usize {
        self.event_registrations
            .iter()
            .filter(|e| e.outcome == RegistrationOutcome::Replaced)
            .count()
    }
}
