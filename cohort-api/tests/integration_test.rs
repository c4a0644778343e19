use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cohort_api::middleware::{AdminClaims, CustomerClaims};
use cohort_api::{app, state::AuthConfig, AppState};
use cohort_order::{FulfillmentSettings, InMemoryRegistry};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

fn test_app() -> Router {
    let registry = Arc::new(InMemoryRegistry::new());
    let state = AppState::new(
        registry.clone(),
        registry,
        FulfillmentSettings::default(),
        AuthConfig {
            secret: SECRET.to_string(),
        },
    );
    app(state)
}

fn expiry() -> usize {
    (chrono::Utc::now().timestamp() + 3600) as usize
}

fn buyer_token(sub: &str) -> String {
    let claims = CustomerClaims {
        sub: sub.to_string(),
        email: Some(format!("{}@example.com", sub)),
        role: "CUSTOMER".to_string(),
        exp: expiry(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

fn operator_token(permissions: &[&str]) -> String {
    let claims = AdminClaims {
        sub: "operator-1".to_string(),
        email: "ops@example.com".to_string(),
        role: "ADMIN".to_string(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        exp: expiry(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_event(app: &Router, admin: &str, capacity: u32, status: &str) -> String {
    let (code, event) = call(
        app,
        "POST",
        "/v1/admin/events",
        Some(admin),
        Some(json!({
            "title": "Survival skills",
            "date": "2026-12-01T08:00:00Z",
            "location": "Galilee",
            "capacity": capacity,
            "price_nis": 120,
            "lifecycle_status": status,
        })),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED);
    event["id"].as_str().unwrap().to_string()
}

async fn create_bundle(app: &Router, admin: &str, body: Value) -> String {
    let (code, bundle) = call(app, "POST", "/v1/admin/bundles", Some(admin), Some(body)).await;
    assert_eq!(code, StatusCode::CREATED, "{}", bundle);
    bundle["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app();
    let (code, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn buyer_routes_require_a_buyer_token() {
    let app = test_app();
    let uri = format!("/v1/bundles/{}/registrations", uuid::Uuid::new_v4());

    let (code, body) = call(&app, "POST", &uri, None, Some(json!({}))).await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (code, _) = call(&app, "POST", &uri, Some("not-a-jwt"), Some(json!({}))).await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);

    let admin = operator_token(&["catalog:write"]);
    let (code, _) = call(&app, "POST", &uri, Some(&admin), Some(json!({}))).await;
    assert_eq!(code, StatusCode::FORBIDDEN);

    let buyer = buyer_token("buyer-1");
    let (code, _) = call(&app, "GET", "/v1/admin/bundles", Some(&buyer), None).await;
    assert_eq!(code, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_replay_and_read_back() {
    let app = test_app();
    let admin = operator_token(&["catalog:write"]);
    let open = create_event(&app, &admin, 10, "active").await;
    let full = create_event(&app, &admin, 0, "active").await;
    let cancelled = create_event(&app, &admin, 10, "cancelled").await;
    let spare = create_event(&app, &admin, 10, "active").await;

    let bundle_id = create_bundle(
        &app,
        &admin,
        json!({
            "title": "Leadership track",
            "price_nis": 450,
            "event_ids": [open, full, cancelled],
            "replacement_event_ids": [spare],
            "publish": true,
            "lifecycle_status": "active",
        }),
    )
    .await;

    let buyer = buyer_token("buyer-42");
    let uri = format!("/v1/bundles/{}/registrations", bundle_id);
    let (code, first) = call(
        &app,
        "POST",
        &uri,
        Some(&buyer),
        Some(json!({ "pickup": "Central station", "medical": "asthma" })),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED, "{}", first);
    assert_eq!(first["replayed"], false);
    assert_eq!(first["payment_status"], "pending");
    assert_eq!(first["amount_due_nis"], 450);

    let registered = first["event_registrations"].as_array().unwrap();
    assert_eq!(registered.len(), 2);
    assert_eq!(registered[0]["event_id"], open.as_str());
    assert_eq!(registered[0]["outcome"], "registered");
    assert_eq!(registered[1]["event_id"], full.as_str());
    assert_eq!(registered[1]["outcome"], "replaced");
    assert_eq!(registered[1]["replacement_event_id"], spare.as_str());

    // The only spare went to the full event, so the cancelled one is skipped.
    let skipped = first["skipped_events"].as_array().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["original_event_id"], cancelled.as_str());
    assert_eq!(skipped[0]["reason"], "no_replacement_available");

    let (code, second) = call(&app, "POST", &uri, Some(&buyer), Some(json!({}))).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(second["replayed"], true);
    assert_eq!(second["bundle_registration_id"], first["bundle_registration_id"]);

    let (code, mine) = call(
        &app,
        "GET",
        &format!("/v1/bundles/{}/registration", bundle_id),
        Some(&buyer),
        None,
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(mine["bundle_registration_id"], first["bundle_registration_id"]);

    let registration_uri = format!("/v1/registrations/{}", first["bundle_registration_id"].as_str().unwrap());
    let (code, _) = call(&app, "GET", &registration_uri, Some(&buyer), None).await;
    assert_eq!(code, StatusCode::OK);
    let (code, _) = call(&app, "GET", &registration_uri, Some(&buyer_token("someone-else")), None).await;
    assert_eq!(code, StatusCode::NOT_FOUND);

    let (code, usage) = call(&app, "GET", &format!("/v1/admin/events/{}", spare), Some(&admin), None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(usage["event"]["registered_count"], 1);
    assert_eq!(usage["remaining_seats"], 9);

    let listing_uri = format!("/v1/admin/bundles/{}/registrations", bundle_id);
    let (code, _) = call(&app, "GET", &listing_uri, Some(&admin), None).await;
    assert_eq!(code, StatusCode::FORBIDDEN);

    let reader = operator_token(&["registrations:read"]);
    let (code, listing) = call(&app, "GET", &listing_uri, Some(&reader), None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(listing.as_array().unwrap().len(), 1);
    assert_eq!(listing[0]["instructions"]["medical"], "asthma");

    // Content is frozen once someone registered.
    let (code, _) = call(
        &app,
        "PUT",
        &format!("/v1/admin/bundles/{}", bundle_id),
        Some(&admin),
        Some(json!({ "title": "Renamed", "price_nis": 1, "event_ids": [open] })),
    )
    .await;
    assert_eq!(code, StatusCode::CONFLICT);
}

#[tokio::test]
async fn unsellable_bundles_are_rejected() {
    let app = test_app();
    let admin = operator_token(&["catalog:write"]);
    let buyer = buyer_token("buyer-7");
    let event = create_event(&app, &admin, 5, "active").await;

    let (code, _) = call(
        &app,
        "POST",
        &format!("/v1/bundles/{}/registrations", uuid::Uuid::new_v4()),
        Some(&buyer),
        Some(json!({})),
    )
    .await;
    assert_eq!(code, StatusCode::NOT_FOUND);

    let expired = create_bundle(
        &app,
        &admin,
        json!({
            "title": "Last season",
            "price_nis": 100,
            "event_ids": [event],
            "valid_until": "2020-01-01T00:00:00Z",
            "publish": true,
            "lifecycle_status": "active",
        }),
    )
    .await;
    let (code, body) = call(
        &app,
        "POST",
        &format!("/v1/bundles/{}/registrations", expired),
        Some(&buyer),
        Some(json!({})),
    )
    .await;
    assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("expired"));

    let draft = create_bundle(&app, &admin, json!({ "title": "Not yet", "price_nis": 100, "event_ids": [event] })).await;
    let (code, _) = call(
        &app,
        "POST",
        &format!("/v1/bundles/{}/registrations", draft),
        Some(&buyer),
        Some(json!({})),
    )
    .await;
    assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn payment_updates_need_permission_and_a_valid_amount() {
    let app = test_app();
    let admin = operator_token(&["catalog:write"]);
    let cashier = operator_token(&["payments:write"]);
    let event = create_event(&app, &admin, 5, "active").await;
    let bundle = create_bundle(
        &app,
        &admin,
        json!({
            "title": "Weekend",
            "price_nis": 200,
            "event_ids": [event],
            "publish": true,
            "lifecycle_status": "active",
        }),
    )
    .await;

    let (_, registration) = call(
        &app,
        "POST",
        &format!("/v1/bundles/{}/registrations", bundle),
        Some(&buyer_token("buyer-5")),
        Some(json!({})),
    )
    .await;
    let payment_uri = format!(
        "/v1/admin/registrations/{}/payment",
        registration["bundle_registration_id"].as_str().unwrap()
    );

    let (code, _) = call(&app, "PUT", &payment_uri, Some(&admin), Some(json!({ "status": "paid", "amount_paid": 200 }))).await;
    assert_eq!(code, StatusCode::FORBIDDEN);

    let (code, _) = call(&app, "PUT", &payment_uri, Some(&cashier), Some(json!({ "status": "paid" }))).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);

    let (code, paid) = call(
        &app,
        "PUT",
        &payment_uri,
        Some(&cashier),
        Some(json!({ "status": "paid", "amount_paid": 200 })),
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(paid["payment_status"], "paid");
    assert_eq!(paid["amount_paid"], 200);
    assert!(paid["payment_date"].is_string());

    let (code, free) = call(&app, "PUT", &payment_uri, Some(&cashier), Some(json!({ "status": "free" }))).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(free["payment_status"], "free");
    assert!(free.get("amount_paid").is_none());

    let (code, _) = call(
        &app,
        "PUT",
        &format!("/v1/admin/registrations/{}/payment", uuid::Uuid::new_v4()),
        Some(&cashier),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn register_without_a_body_uses_empty_instructions() {
    let app = test_app();
    let admin = operator_token(&["catalog:write"]);
    let event = create_event(&app, &admin, 5, "active").await;
    let bundle = create_bundle(
        &app,
        &admin,
        json!({
            "title": "Intro day",
            "price_nis": 0,
            "event_ids": [event],
            "publish": true,
            "lifecycle_status": "active",
        }),
    )
    .await;

    let (code, registration) = call(
        &app,
        "POST",
        &format!("/v1/bundles/{}/registrations", bundle),
        Some(&buyer_token("buyer-7")),
        None,
    )
    .await;
    assert_eq!(code, StatusCode::CREATED, "{}", registration);
    assert_eq!(registration["payment_status"], "free");
    assert_eq!(registration["event_registrations"].as_array().unwrap().len(), 1);
}
