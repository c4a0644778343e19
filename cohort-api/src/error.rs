use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cohort_catalog::CatalogError;
use cohort_core::CoreError;
use cohort_order::{AdminError, FulfillmentError, LedgerError};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    /// The request is well formed but the bundle cannot be sold right now.
    UnprocessableError(String),
    ConflictError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::UnprocessableError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::ValidationError(msg),
            CoreError::IdentityError(msg) => AppError::AuthenticationError(msg),
            CoreError::StorageError(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            CatalogError::Unavailable(_) | CatalogError::Expired(_) | CatalogError::EmptyBundle(_) => {
                AppError::UnprocessableError(err.to_string())
            }
            CatalogError::InvalidBundle(_) | CatalogError::InvalidEvent(_) | CatalogError::UnknownStatus(_) => {
                AppError::ValidationError(err.to_string())
            }
            CatalogError::Storage(inner) => inner.into(),
        }
    }
}

impl From<FulfillmentError> for AppError {
    fn from(err: FulfillmentError) -> Self {
        match err {
            FulfillmentError::Validation(msg) => AppError::ValidationError(msg),
            FulfillmentError::Catalog(inner) => inner.into(),
            FulfillmentError::Conflict { .. } => AppError::ConflictError(err.to_string()),
            FulfillmentError::Planning(fault) => AppError::InternalServerError(fault.to_string()),
            FulfillmentError::Storage(inner) => inner.into(),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            LedgerError::InvalidAmount(_) => AppError::ValidationError(err.to_string()),
            LedgerError::Storage(inner) => inner.into(),
        }
    }
}

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::BundleNotFound(_) | AdminError::EventNotFound(_) => AppError::NotFoundError(err.to_string()),
            AdminError::BundleLocked(_) => AppError::ConflictError(err.to_string()),
            AdminError::Catalog(inner) => inner.into(),
            AdminError::Storage(inner) => inner.into(),
        }
    }
}
