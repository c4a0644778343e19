use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use cohort_core::identity::BuyerIdentity;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomerClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: usize,
}

fn bearer_claims<T: DeserializeOwned>(req: &Request, secret: &str) -> Result<T, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    decode::<T>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))
}

// ============================================================================
// Customer Authentication Middleware
// ============================================================================

pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims: CustomerClaims = bearer_claims(&req, &state.auth.secret)?;

    if claims.role != "CUSTOMER" {
        return Err(AppError::AuthorizationError("Buyer token required".to_string()));
    }

    let buyer = BuyerIdentity::new(claims.sub, claims.email)?;
    req.extensions_mut().insert(buyer);

    Ok(next.run(req).await)
}

// ============================================================================
// Admin Authentication Middleware
// ============================================================================

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims: AdminClaims = bearer_claims(&req, &state.auth.secret)?;

    if claims.role != "ADMIN" && claims.role != "SUPER_ADMIN" {
        return Err(AppError::AuthorizationError("Operator token required".to_string()));
    }

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

// ============================================================================
// Permission Check Helper
// ============================================================================

pub fn has_permission(claims: &AdminClaims, permission: &str) -> bool {
    claims.role == "SUPER_ADMIN" || claims.permissions.iter().any(|p| p == permission)
}

pub fn require_permission(claims: &AdminClaims, permission: &str) -> Result<(), AppError> {
    if has_permission(claims, permission) {
        Ok(())
    } else {
        Err(AppError::AuthorizationError(format!("Missing permission {}", permission)))
    }
}
