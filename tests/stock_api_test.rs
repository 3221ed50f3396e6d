mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::TestApp;
use larder_api::app_router;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

/// Decimals serialize as strings with driver-dependent scale; compare values
fn decimal_of(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal field serialized as string")
        .parse()
        .expect("parsable decimal")
}

fn request(
    method: Method,
    uri: &str,
    ctx: Option<(&Uuid, &Uuid)>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((account_id, user_id)) = ctx {
        builder = builder
            .header("x-account-id", account_id.to_string())
            .header("x-user-id", user_id.to_string());
    }
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = TestApp::new().await;
    let router = app_router(app.state.clone());

    let response = router
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "up");
}

#[tokio::test]
async fn missing_tenant_headers_are_unauthorized() {
    let app = TestApp::new().await;
    let router = app_router(app.state.clone());

    let response = router
        .oneshot(request(Method::GET, "/api/v1/stock", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn stock_flow_over_http() {
    let app = TestApp::new().await;
    let router = app_router(app.state.clone());
    let account_id = app.ctx.account_id;
    let user_id = app.ctx.user_id;
    let ctx = Some((&account_id, &user_id));

    // Create a store and an item
    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/stores",
            ctx,
            Some(json!({ "name": "Main Kitchen" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let store = body_json(response).await;

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/items",
            ctx,
            Some(json!({
                "name": "Chicken breast",
                "unit": "kg",
                "cost_price": "7.50",
                "min_stock_level": "20"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let item = body_json(response).await;

    // Record a purchase, then waste with a caller-positive quantity
    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/movements",
            ctx,
            Some(json!({
                "item_id": item["id"],
                "store_id": store["id"],
                "quantity": "50",
                "movement_type": "purchase"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/movements",
            ctx,
            Some(json!({
                "item_id": item["id"],
                "store_id": store["id"],
                "quantity": "5",
                "movement_type": "waste",
                "reason": "spoiled"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let waste = body_json(response).await;
    // Normalized negative regardless of caller sign
    assert_eq!(decimal_of(&waste["quantity"]), dec!(-5));

    // Derived stock reflects both movements
    let response = router
        .clone()
        .oneshot(request(Method::GET, "/api/v1/stock", ctx, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let stock = &body["data"]["stock"][0];
    assert_eq!(decimal_of(&stock["quantity"]), dec!(45));
    assert_eq!(stock["is_low_stock"], false);

    // Sign mismatch surfaces as a 400 with the standard error shape
    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/movements",
            ctx,
            Some(json!({
                "item_id": item["id"],
                "store_id": store["id"],
                "quantity": "-1",
                "movement_type": "purchase"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Bad Request");

    // Another tenant sees an empty larder
    let other_account = Uuid::new_v4();
    let other_user = Uuid::new_v4();
    let response = router
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/v1/stock",
            Some((&other_account, &other_user)),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 0);
}
