use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use cohort_core::identity::BuyerIdentity;
use cohort_core::payment::PaymentStatus;
use cohort_order::{BundleRegistration, BuyerInstructions, EventRegistrationEntry, SkippedEventEntry};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub bundle_registration_id: Uuid,
    pub bundle_id: Uuid,
    pub event_registrations: Vec<EventRegistrationEntry>,
    pub skipped_events: Vec<SkippedEventEntry>,
    pub payment_status: PaymentStatus,
    pub amount_due_nis: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_paid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// True when an existing registration was returned and nothing new was
    /// fulfilled.
    pub replayed: bool,
}

impl RegistrationResponse {
    fn from_registration(registration: BundleRegistration, replayed: bool) -> Self {
        Self {
            bundle_registration_id: registration.id,
            bundle_id: registration.bundle_id,
            payment_status: registration.payment_status(),
            amount_paid: registration.payment.amount_paid(),
            payment_date: registration.payment.payment_date(),
            amount_due_nis: registration.amount_due_nis,
            created_at: registration.created_at,
            event_registrations: registration.event_registrations,
            skipped_events: registration.skipped_events,
            replayed,
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bundles/{bundle_id}/registrations", post(register_bundle))
        .route("/v1/bundles/{bundle_id}/registration", get(my_bundle_registration))
        .route("/v1/registrations/{id}", get(get_registration))
}

async fn register_bundle(
    State(state): State<AppState>,
    Extension(buyer): Extension<BuyerIdentity>,
    Path(bundle_id): Path<Uuid>,
    instructions: Option<Json<BuyerInstructions>>,
) -> Result<(StatusCode, Json<RegistrationResponse>), AppError> {
    // All instruction fields are optional, so an empty body is a plain purchase.
    let instructions = instructions.map(|Json(body)| body).unwrap_or_default();
    let receipt = state
        .fulfillment
        .register_bundle(&buyer, bundle_id, instructions)
        .await?;

    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(RegistrationResponse::from_registration(receipt.registration, receipt.replayed)),
    ))
}

async fn my_bundle_registration(
    State(state): State<AppState>,
    Extension(buyer): Extension<BuyerIdentity>,
    Path(bundle_id): Path<Uuid>,
) -> Result<Json<RegistrationResponse>, AppError> {
    let registration = state
        .fulfillment
        .existing_registration(&buyer.buyer_id, bundle_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("No registration for bundle {}", bundle_id)))?;

    Ok(Json(RegistrationResponse::from_registration(registration, true)))
}

async fn get_registration(
    State(state): State<AppState>,
    Extension(buyer): Extension<BuyerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<RegistrationResponse>, AppError> {
    // Someone else's registration is reported as missing.
    let registration = state
        .fulfillment
        .registration(id)
        .await?
        .filter(|r| r.buyer_id == buyer.buyer_id)
        .ok_or_else(|| AppError::NotFoundError(format!("Registration not found: {}", id)))?;

    Ok(Json(RegistrationResponse::from_registration(registration, true)))
}
