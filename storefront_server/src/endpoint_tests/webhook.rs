use actix_web::{http::StatusCode, test, test::TestRequest, App};
use serde_json::json;
use stf_common::Money;
use storefront_engine::{
    db_types::{NewLineItem, NewOrder, ShippingAddress},
    traits::CatalogManagement,
    SqliteDatabase,
};

use super::helpers::{configure_webhook, flow_api, into_json, seed_product, test_db, TEST_WEBHOOK_SECRET};
use crate::helpers::calculate_hmac;

const WEBHOOK_URI: &str = "/payments/webhook";

fn engine_address() -> ShippingAddress {
    ShippingAddress {
        name: "Ada Lovelace".to_string(),
        street: "12 Analytical Row".to_string(),
        city: "London".to_string(),
        state: None,
        postal_code: "N1 9GU".to_string(),
        country: "GB".to_string(),
    }
}

/// Seeds a product with the given stock and opens a gateway order for `quantity` of it.
async fn gateway_order(db: &SqliteDatabase, stock: i64, quantity: i64, gateway_order_id: &str) -> i64 {
    let gadget = seed_product(db, "Gadget", Money::from_whole(20), stock).await;
    flow_api(db)
        .process_new_order(NewOrder::gateway(
            "cust-1".to_string(),
            vec![NewLineItem { product_id: gadget.id, quantity }],
            engine_address(),
            gateway_order_id.to_string(),
        ))
        .await
        .expect("Error creating gateway order");
    gadget.id
}

fn signed_request(body: &serde_json::Value, secret: &str) -> TestRequest {
    let payload = body.to_string();
    let signature = calculate_hmac(secret, payload.as_bytes());
    TestRequest::post()
        .uri(WEBHOOK_URI)
        .insert_header(("x-signature", signature))
        .insert_header(("content-type", "application/json"))
        .set_payload(payload)
}

fn captured_event() -> serde_json::Value {
    json!({
        "event": "payment.captured",
        "event_id": "evt-1",
        "order_id": "gw-1",
        "payment_id": "pay-1"
    })
}

#[actix_web::test]
async fn a_valid_capture_confirms_the_order() {
    let db = test_db().await;
    let product_id = gateway_order(&db, 2, 2, "gw-1").await;
    let app = test::init_service(App::new().configure(configure_webhook(&db))).await;

    let req = signed_request(&captured_event(), TEST_WEBHOOK_SECRET).to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["status"], json!("confirmed"));
    assert_eq!(body["data"]["payment_status"], json!("paid"));
    assert_eq!(body["data"]["gateway_payment_id"], json!("pay-1"));
    assert_eq!(db.product_by_id(product_id).await.unwrap().unwrap().stock, 0);

    // Redelivery of the identical event: 200, no further decrement.
    let req = signed_request(&captured_event(), TEST_WEBHOOK_SECRET).to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Event already processed."));
    assert_eq!(db.product_by_id(product_id).await.unwrap().unwrap().stock, 0);
}

#[actix_web::test]
async fn a_bad_signature_is_rejected_before_any_mutation() {
    let db = test_db().await;
    let product_id = gateway_order(&db, 2, 2, "gw-1").await;
    let app = test::init_service(App::new().configure(configure_webhook(&db))).await;

    let req = signed_request(&captured_event(), "not-the-real-secret").to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    // The order is untouched: no decrement, still pending.
    assert_eq!(db.product_by_id(product_id).await.unwrap().unwrap().stock, 2);
}

#[actix_web::test]
async fn a_missing_signature_is_rejected() {
    let db = test_db().await;
    let product_id = gateway_order(&db, 2, 2, "gw-1").await;
    let app = test::init_service(App::new().configure(configure_webhook(&db))).await;

    let req = TestRequest::post()
        .uri(WEBHOOK_URI)
        .insert_header(("content-type", "application/json"))
        .set_payload(captured_event().to_string())
        .to_request();
    let (status, _) = into_json(test::call_service(&app, req).await).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(db.product_by_id(product_id).await.unwrap().unwrap().stock, 2);
}

#[actix_web::test]
async fn an_unresolvable_order_is_a_404() {
    let db = test_db().await;
    let app = test::init_service(App::new().configure(configure_webhook(&db))).await;

    let event = json!({
        "event": "payment.captured",
        "event_id": "evt-9",
        "order_id": "gw-unknown",
        "payment_id": "pay-9"
    });
    let req = signed_request(&event, TEST_WEBHOOK_SECRET).to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
}

#[actix_web::test]
async fn a_failed_payment_leaves_the_order_retryable() {
    let db = test_db().await;
    let product_id = gateway_order(&db, 2, 1, "gw-1").await;
    let app = test::init_service(App::new().configure(configure_webhook(&db))).await;

    let event = json!({ "event": "payment.failed", "event_id": "evt-1", "order_id": "gw-1" });
    let req = signed_request(&event, TEST_WEBHOOK_SECRET).to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("pending"));
    assert_eq!(body["data"]["payment_status"], json!("failed"));
    assert_eq!(db.product_by_id(product_id).await.unwrap().unwrap().stock, 2);
}

#[actix_web::test]
async fn a_capture_without_a_payment_id_is_a_validation_error() {
    let db = test_db().await;
    gateway_order(&db, 2, 1, "gw-1").await;
    let app = test::init_service(App::new().configure(configure_webhook(&db))).await;

    let event = json!({ "event": "payment.captured", "event_id": "evt-1", "order_id": "gw-1" });
    let req = signed_request(&event, TEST_WEBHOOK_SECRET).to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}
