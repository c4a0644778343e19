use uuid::Uuid;

/// Emitted once a bundle purchase has been fulfilled and committed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BundleRegisteredEvent {
    pub registration_id: Uuid,
    pub bundle_id: Uuid,
    pub bundle_title: String,
    pub buyer_id: String,
    pub buyer_email: Option<String>,
    pub registered_event_ids: Vec<Uuid>,
    pub replaced_count: usize,
    pub skipped_count: usize,
    pub payment_status: String,
    pub amount_due_nis: i64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentStatusChangedEvent {
    pub registration_id: Uuid,
    pub bundle_id: Uuid,
    pub buyer_id: String,
    pub buyer_email: Option<String>,
    pub previous_status: String,
    pub new_status: String,
    pub amount_paid: Option<i64>,
    pub timestamp: i64,
}
