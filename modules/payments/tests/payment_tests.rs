mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serial_test::serial;
use tower::ServiceExt;
use uuid::Uuid;

use common::StubGateway;

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// TEST 1: Creating a provider-settled payment assigns an external reference
#[tokio::test]
#[serial]
async fn test_create_payment_assigns_reference() {
    let pool = common::setup_pool().await;
    let app = common::app(&pool, StubGateway::new());

    let body = serde_json::json!({
        "branch_id": "suc-centro",
        "sale_reference": common::unique_sale_reference(),
        "method": "card",
        "amount_cents": 235000
    });

    let response = app.oneshot(post_json("/api/payments", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = common::body_json(response).await;
    assert_eq!(json["status"], "pending");
    assert_eq!(json["currency"], "ARS");
    let reference = json["external_reference"].as_str().unwrap();
    assert!(reference.starts_with("pay_"), "generated reference: {}", reference);

    let payment_id = Uuid::parse_str(json["id"].as_str().unwrap()).unwrap();
    common::cleanup_payments(&pool, &[payment_id]).await;
    common::teardown_pool(pool).await;
}

/// TEST 2: Cash payments carry no provider reference
#[tokio::test]
#[serial]
async fn test_create_cash_payment_has_no_reference() {
    let pool = common::setup_pool().await;
    let app = common::app(&pool, StubGateway::new());

    let body = serde_json::json!({
        "branch_id": "suc-norte",
        "sale_reference": common::unique_sale_reference(),
        "method": "cash",
        "amount_cents": 80000
    });

    let response = app.oneshot(post_json("/api/payments", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = common::body_json(response).await;
    assert!(json["external_reference"].is_null());

    let payment_id = Uuid::parse_str(json["id"].as_str().unwrap()).unwrap();
    common::cleanup_payments(&pool, &[payment_id]).await;
    common::teardown_pool(pool).await;
}

/// TEST 3: Negative amounts are rejected
#[tokio::test]
#[serial]
async fn test_create_payment_rejects_negative_amount() {
    let pool = common::setup_pool().await;
    let app = common::app(&pool, StubGateway::new());

    let body = serde_json::json!({
        "branch_id": "suc-centro",
        "sale_reference": common::unique_sale_reference(),
        "method": "card",
        "amount_cents": -1
    });

    let response = app.oneshot(post_json("/api/payments", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    common::teardown_pool(pool).await;
}

/// TEST 4: Fetch a payment by id
#[tokio::test]
#[serial]
async fn test_get_payment() {
    let pool = common::setup_pool().await;
    let reference = common::unique_external_reference();
    let payment_id = common::seed_payment(&pool, "card", "pending", Some(&reference), None).await;

    let app = common::app(&pool, StubGateway::new());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(&format!("/api/payments/{}", payment_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = common::body_json(response).await;
    assert_eq!(json["id"], payment_id.to_string());
    assert_eq!(json["external_reference"], reference.as_str());
    assert_eq!(json["status"], "pending");

    common::cleanup_payments(&pool, &[payment_id]).await;
    common::teardown_pool(pool).await;
}

/// TEST 5: Unknown payment id answers 404
#[tokio::test]
#[serial]
async fn test_get_payment_not_found() {
    let pool = common::setup_pool().await;
    let app = common::app(&pool, StubGateway::new());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(&format!("/api/payments/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    common::teardown_pool(pool).await;
}

/// TEST 6: Manual confirmation approves a cash payment exactly once
#[tokio::test]
#[serial]
async fn test_confirm_cash_payment_once() {
    let pool = common::setup_pool().await;
    let payment_id = common::seed_payment(&pool, "cash", "pending", None, None).await;

    let app = common::app(&pool, StubGateway::new());
    let uri = format!("/api/payments/{}/confirm", payment_id);

    let first = app
        .clone()
        .oneshot(post_json(&uri, &serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let json = common::body_json(first).await;
    assert_eq!(json["status"], "approved");

    // Second confirmation must not rewrite the record.
    let second = app
        .oneshot(post_json(&uri, &serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let (status, _) = common::payment_state(&pool, payment_id).await;
    assert_eq!(status, "approved");

    common::cleanup_payments(&pool, &[payment_id]).await;
    common::teardown_pool(pool).await;
}

/// TEST 7: Provider-settled methods cannot be confirmed manually
#[tokio::test]
#[serial]
async fn test_confirm_card_payment_rejected() {
    let pool = common::setup_pool().await;
    let reference = common::unique_external_reference();
    let payment_id = common::seed_payment(&pool, "card", "pending", Some(&reference), None).await;

    let app = common::app(&pool, StubGateway::new());

    let response = app
        .oneshot(post_json(
            &format!("/api/payments/{}/confirm", payment_id),
            &serde_json::json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = common::payment_state(&pool, payment_id).await;
    assert_eq!(status, "pending");

    common::cleanup_payments(&pool, &[payment_id]).await;
    common::teardown_pool(pool).await;
}

/// TEST 8: List payments filtered by sale reference
#[tokio::test]
#[serial]
async fn test_list_payments_by_sale_reference() {
    let pool = common::setup_pool().await;
    let app = common::app(&pool, StubGateway::new());

    let sale_reference = common::unique_sale_reference();

    // Two payments on the same sale (split payment), one unrelated.
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    for (id, amount) in [(first, 100000i64), (second, 50000i64)] {
        sqlx::query(
            r#"INSERT INTO payments (
                id, branch_id, sale_reference, method, amount_cents, currency,
                external_reference, status, created_at, updated_at
            ) VALUES ($1, 'suc-centro', $2, 'card', $3, 'ARS', $4, 'pending', NOW(), NOW())"#,
        )
        .bind(id)
        .bind(&sale_reference)
        .bind(amount)
        .bind(common::unique_external_reference())
        .execute(&pool)
        .await
        .unwrap();
    }
    let unrelated =
        common::seed_payment(&pool, "card", "pending", Some(&common::unique_external_reference()), None)
            .await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(&format!("/api/payments?sale_reference={}", sale_reference))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = common::body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2, "Should list both split payments");

    common::cleanup_payments(&pool, &[first, second, unrelated]).await;
    common::teardown_pool(pool).await;
}
