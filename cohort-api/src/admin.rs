use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use cohort_catalog::{BundleDefinition, BundleStatus, EventRecord, EventStatus, NewBundle, NewEvent};
use cohort_core::payment::PaymentStatus;
use cohort_order::{BundleRegistration, EventUtilization};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{require_permission, AdminClaims};
use crate::state::AppState;

const PAYMENTS_WRITE: &str = "payments:write";
const CATALOG_WRITE: &str = "catalog:write";
const REGISTRATIONS_READ: &str = "registrations:read";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub status: PaymentStatus,
    pub amount_paid: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct EventStatusRequest {
    pub status: EventStatus,
}

#[derive(Debug, Deserialize)]
pub struct BundleStatusRequest {
    pub publish: bool,
    pub status: BundleStatus,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/registrations/{id}/payment", put(update_payment))
        .route("/v1/admin/events", post(create_event))
        .route("/v1/admin/events/{id}", get(get_event))
        .route("/v1/admin/events/{id}/status", patch(update_event_status))
        .route("/v1/admin/bundles", post(create_bundle).get(list_bundles))
        .route("/v1/admin/bundles/{id}", put(redefine_bundle))
        .route("/v1/admin/bundles/{id}/status", patch(update_bundle_status))
        .route("/v1/admin/bundles/{id}/registrations", get(list_bundle_registrations))
}

// ============================================================================
// Payments
// ============================================================================

async fn update_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePaymentRequest>,
) -> Result<Json<BundleRegistration>, AppError> {
    require_permission(&claims, PAYMENTS_WRITE)?;

    tracing::info!(registration_id = %id, operator = %claims.sub, status = %req.status, "Operator payment update");
    let updated = state
        .ledger
        .set_payment_status(id, req.status, req.amount_paid)
        .await?;
    Ok(Json(updated))
}

async fn list_bundle_registrations(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<BundleRegistration>>, AppError> {
    // The listing carries buyers' medical notes in the clear.
    require_permission(&claims, REGISTRATIONS_READ)?;
    Ok(Json(state.fulfillment.registrations_for_bundle(id).await?))
}

// ============================================================================
// Events
// ============================================================================

async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Json(req): Json<NewEvent>,
) -> Result<(StatusCode, Json<EventRecord>), AppError> {
    require_permission(&claims, CATALOG_WRITE)?;
    let event = state.catalog_admin.create_event(req).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventUtilization>, AppError> {
    Ok(Json(state.catalog_admin.event_utilization(id).await?))
}

async fn update_event_status(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Path(id): Path<Uuid>,
    Json(req): Json<EventStatusRequest>,
) -> Result<Json<EventRecord>, AppError> {
    require_permission(&claims, CATALOG_WRITE)?;
    Ok(Json(state.catalog_admin.set_event_status(id, req.status).await?))
}

// ============================================================================
// Bundles
// ============================================================================

async fn create_bundle(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Json(req): Json<NewBundle>,
) -> Result<(StatusCode, Json<BundleDefinition>), AppError> {
    require_permission(&claims, CATALOG_WRITE)?;
    let bundle = state.catalog_admin.create_bundle(req).await?;
    Ok((StatusCode::CREATED, Json(bundle)))
}

async fn list_bundles(State(state): State<AppState>) -> Result<Json<Vec<BundleDefinition>>, AppError> {
    Ok(Json(state.catalog_admin.list_bundles().await?))
}

async fn redefine_bundle(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Path(id): Path<Uuid>,
    Json(req): Json<NewBundle>,
) -> Result<Json<BundleDefinition>, AppError> {
    require_permission(&claims, CATALOG_WRITE)?;
    Ok(Json(state.catalog_admin.redefine_bundle(id, req).await?))
}

async fn update_bundle_status(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Path(id): Path<Uuid>,
    Json(req): Json<BundleStatusRequest>,
) -> Result<Json<BundleDefinition>, AppError> {
    require_permission(&claims, CATALOG_WRITE)?;
    Ok(Json(
        state
            .catalog_admin
            .set_bundle_status(id, req.publish, req.status)
            .await?,
    ))
}
