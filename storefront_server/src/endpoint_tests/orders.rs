use actix_web::{http::StatusCode, test, test::TestRequest, App};
use serde_json::json;
use stf_common::Money;
use storefront_engine::{
    db_types::{NewLineItem, NewOrder, ShippingAddress},
    traits::CatalogManagement,
};

use super::helpers::{configure_api, flow_api, into_json, seed_product, shipping_address_json, test_db};
use crate::auth::{USER_ID_HEADER, USER_ROLES_HEADER};

fn order_body(product_id: i64, quantity: i64, payment: &str) -> serde_json::Value {
    json!({
        "items": [{"product": product_id, "quantity": quantity}],
        "shippingAddress": shipping_address_json(),
        "payment": payment
    })
}

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

#[actix_web::test]
async fn cod_checkout_returns_the_envelope_and_commits_stock() {
    let db = test_db().await;
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 5).await;
    let app = test::init_service(App::new().configure(configure_api(&db))).await;

    let req = TestRequest::post()
        .uri("/orders")
        .insert_header((USER_ID_HEADER, "alice"))
        .set_json(order_body(widget.id, 3, "COD"))
        .to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["statusCode"], json!(201));
    assert_eq!(body["data"]["total_price"], json!(3000));
    assert_eq!(body["data"]["status"], json!("pending"));
    assert_eq!(body["data"]["payment_status"], json!("cash-on-delivery"));
    let order_id = body["data"]["order_id"].as_str().expect("order_id missing");
    assert!(order_id.starts_with("SF-"), "was: {order_id}");

    let product = db.product_by_id(widget.id).await.unwrap().unwrap();
    assert_eq!(product.stock, 2);
}

#[actix_web::test]
async fn checkout_requires_an_identity() {
    let db = test_db().await;
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 5).await;
    let app = test::init_service(App::new().configure(configure_api(&db))).await;

    let req = TestRequest::post().uri("/orders").set_json(order_body(widget.id, 1, "COD")).to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["statusCode"], json!(401));
}

#[actix_web::test]
async fn out_of_stock_is_a_400_with_the_remaining_count() {
    let db = test_db().await;
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 5).await;
    let app = test::init_service(App::new().configure(configure_api(&db))).await;

    let req = TestRequest::post()
        .uri("/orders")
        .insert_header((USER_ID_HEADER, "alice"))
        .set_json(order_body(widget.id, 10, "COD"))
        .to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("Widget"), "was: {message}");
    assert!(message.contains("only 5 remaining"), "was: {message}");
    // Nothing was committed.
    assert_eq!(db.product_by_id(widget.id).await.unwrap().unwrap().stock, 5);
}

#[actix_web::test]
async fn customers_see_only_their_own_orders() {
    let db = test_db().await;
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 10).await;
    let api = flow_api(&db);
    for customer in ["alice", "bob", "alice"] {
        api.process_new_order(NewOrder::cash_on_delivery(
            customer.to_string(),
            vec![NewLineItem { product_id: widget.id, quantity: 1 }],
            engine_address(),
        ))
        .await
        .unwrap();
    }
    let app = test::init_service(App::new().configure(configure_api(&db))).await;

    let req = TestRequest::get().uri("/orders").insert_header((USER_ID_HEADER, "alice")).to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;

    assert_eq!(status, StatusCode::OK);
    let orders = body["data"]["orders"].as_array().expect("orders missing");
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o["customer_id"] == json!("alice")));
}

#[actix_web::test]
async fn admin_routes_require_the_admin_role() {
    let db = test_db().await;
    let app = test::init_service(App::new().configure(configure_api(&db))).await;

    let req = TestRequest::get().uri("/admin/orders").insert_header((USER_ID_HEADER, "alice")).to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], json!(false));

    let req = TestRequest::get()
        .uri("/admin/orders")
        .insert_header((USER_ID_HEADER, "root"))
        .insert_header((USER_ROLES_HEADER, "user,admin"))
        .to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
}

#[actix_web::test]
async fn status_updates_validate_the_enum_and_the_transition() {
    let db = test_db().await;
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 5).await;
    let api = flow_api(&db);
    let order = api
        .process_new_order(NewOrder::cash_on_delivery(
            "alice".to_string(),
            vec![NewLineItem { product_id: widget.id, quantity: 1 }],
            engine_address(),
        ))
        .await
        .unwrap();
    let app = test::init_service(App::new().configure(configure_api(&db))).await;
    let uri = format!("/admin/orders/{}", order.order_id.as_str());
    let admin = |req: TestRequest| {
        req.insert_header((USER_ID_HEADER, "root")).insert_header((USER_ROLES_HEADER, "admin"))
    };

    // Not one of the six statuses: rejected at the deserialization boundary.
    let req = admin(TestRequest::patch().uri(&uri)).set_json(json!({"orderStatus": "teleported"})).to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    // Legal forward jump.
    let req = admin(TestRequest::patch().uri(&uri)).set_json(json!({"orderStatus": "delivered"})).to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("delivered"));

    // Illegal transition out of a delivered order.
    let req = admin(TestRequest::patch().uri(&uri)).set_json(json!({"orderStatus": "pending"})).to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("Delivered"), "was: {message}");
}

#[actix_web::test]
async fn only_the_owner_or_an_admin_can_cancel() {
    let db = test_db().await;
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 5).await;
    let api = flow_api(&db);
    let order = api
        .process_new_order(NewOrder::cash_on_delivery(
            "alice".to_string(),
            vec![NewLineItem { product_id: widget.id, quantity: 2 }],
            engine_address(),
        ))
        .await
        .unwrap();
    let app = test::init_service(App::new().configure(configure_api(&db))).await;
    let uri = format!("/orders/cancel/{}", order.order_id.as_str());

    let req = TestRequest::patch().uri(&uri).insert_header((USER_ID_HEADER, "bob")).to_request();
    let (status, _) = into_json(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(db.product_by_id(widget.id).await.unwrap().unwrap().stock, 3);

    let req = TestRequest::patch().uri(&uri).insert_header((USER_ID_HEADER, "alice")).to_request();
    let (status, body) = into_json(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("cancelled"));
    assert_eq!(db.product_by_id(widget.id).await.unwrap().unwrap().stock, 5);
}
