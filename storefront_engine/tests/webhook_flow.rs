mod support;

use stf_common::Money;
use storefront_engine::{
    db_types::{NewLineItem, NewOrder, OrderStatusType, PaymentStatusType},
    traits::{CatalogManagement, OrderManagement, StorefrontError},
};
use support::{flow_api, new_db, seed_product, shipping_address, stock_of};

fn one(product_id: i64, quantity: i64) -> Vec<NewLineItem> {
    vec![NewLineItem { product_id, quantity }]
}

#[tokio::test]
async fn capture_commits_stock_and_confirms_the_order() {
    let db = new_db().await;
    let api = flow_api(&db);
    let gadget = seed_product(&db, "Gadget", Money::from_whole(20), 2).await;

    api.process_new_order(NewOrder::gateway(
        "cust-1".to_string(),
        one(gadget.id, 2),
        shipping_address(),
        "gw-1".to_string(),
    ))
    .await
    .unwrap();

    let outcome = api.payment_captured("gw-1", "evt-1", "pay-1").await.expect("Capture should succeed");
    assert!(outcome.was_applied());
    let order = outcome.order();
    assert_eq!(order.status, OrderStatusType::Confirmed);
    assert_eq!(order.payment_status, PaymentStatusType::Paid);
    assert_eq!(order.gateway_payment_id.as_deref(), Some("pay-1"));
    assert!(order.stock_committed);
    assert_eq!(stock_of(&db, gadget.id).await, 0);
}

#[tokio::test]
async fn redelivered_capture_events_are_idempotent() {
    let db = new_db().await;
    let api = flow_api(&db);
    let gadget = seed_product(&db, "Gadget", Money::from_whole(20), 2).await;

    api.process_new_order(NewOrder::gateway(
        "cust-1".to_string(),
        one(gadget.id, 2),
        shipping_address(),
        "gw-1".to_string(),
    ))
    .await
    .unwrap();

    assert!(api.payment_captured("gw-1", "evt-1", "pay-1").await.unwrap().was_applied());
    assert_eq!(stock_of(&db, gadget.id).await, 0);

    // Identical redelivery: no further decrement, no error.
    let replay = api.payment_captured("gw-1", "evt-1", "pay-1").await.unwrap();
    assert!(!replay.was_applied());
    assert_eq!(stock_of(&db, gadget.id).await, 0);

    // Even a fresh event id cannot double-settle a paid order.
    let replay = api.payment_captured("gw-1", "evt-2", "pay-1").await.unwrap();
    assert!(!replay.was_applied());
    assert_eq!(stock_of(&db, gadget.id).await, 0);
}

#[tokio::test]
async fn capture_for_an_unknown_order_fails() {
    let db = new_db().await;
    let api = flow_api(&db);
    let err = api.payment_captured("gw-missing", "evt-1", "pay-1").await.expect_err("Unknown order must fail");
    assert!(matches!(err, StorefrontError::OrderNotFound(_)));
}

#[tokio::test]
async fn capture_shortfall_aborts_and_stays_retryable() {
    let db = new_db().await;
    let api = flow_api(&db);
    let gadget = seed_product(&db, "Gadget", Money::from_whole(20), 2).await;

    api.process_new_order(NewOrder::gateway(
        "cust-1".to_string(),
        one(gadget.id, 2),
        shipping_address(),
        "gw-1".to_string(),
    ))
    .await
    .unwrap();

    // A COD checkout races in and takes one unit before the capture arrives.
    let cod = api
        .process_new_order(NewOrder::cash_on_delivery("cust-2".to_string(), one(gadget.id, 1), shipping_address()))
        .await
        .unwrap();
    assert_eq!(stock_of(&db, gadget.id).await, 1);

    let err = api.payment_captured("gw-1", "evt-1", "pay-1").await.expect_err("Capture must hit the shortfall");
    match &err {
        StorefrontError::OutOfStock { product, requested, remaining } => {
            assert_eq!(product, "Gadget");
            assert_eq!(*requested, 2);
            assert_eq!(*remaining, 1);
        },
        e => panic!("Expected OutOfStock, got {e}"),
    }
    // Nothing moved: stock, order status and payment status are untouched.
    assert_eq!(stock_of(&db, gadget.id).await, 1);
    let order = db.order_by_gateway_id("gw-1").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatusType::Pending);

    // Stock comes back (the competing order is cancelled) and the gateway retries the same
    // event: this time it must succeed, because the failed attempt also rolled its ledger
    // entry back.
    api.cancel_order(&cod.order_id).await.unwrap();
    let outcome = api.payment_captured("gw-1", "evt-1", "pay-1").await.unwrap();
    assert!(outcome.was_applied());
    assert_eq!(stock_of(&db, gadget.id).await, 0);
}

#[tokio::test]
async fn failed_payments_leave_the_order_retryable() {
    let db = new_db().await;
    let api = flow_api(&db);
    let gadget = seed_product(&db, "Gadget", Money::from_whole(20), 2).await;

    api.process_new_order(NewOrder::gateway(
        "cust-1".to_string(),
        one(gadget.id, 1),
        shipping_address(),
        "gw-1".to_string(),
    ))
    .await
    .unwrap();

    let order = api.payment_failed("gw-1", "evt-1").await.expect("payment.failed should apply");
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatusType::Failed);
    assert_eq!(stock_of(&db, gadget.id).await, 2);

    // A later successful capture still settles the order.
    let outcome = api.payment_captured("gw-1", "evt-2", "pay-1").await.unwrap();
    assert!(outcome.was_applied());
    assert_eq!(outcome.order().payment_status, PaymentStatusType::Paid);
    assert_eq!(stock_of(&db, gadget.id).await, 1);
}

#[tokio::test]
async fn cancelling_an_uncaptured_gateway_order_credits_nothing() {
    let db = new_db().await;
    let api = flow_api(&db);
    let gadget = seed_product(&db, "Gadget", Money::from_whole(20), 5).await;

    let order = api
        .process_new_order(NewOrder::gateway(
            "cust-1".to_string(),
            one(gadget.id, 3),
            shipping_address(),
            "gw-1".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(stock_of(&db, gadget.id).await, 5);

    let cancelled = api.cancel_order(&order.order_id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
    // No capture ever happened, so there is nothing to credit back.
    assert_eq!(stock_of(&db, gadget.id).await, 5);
}

#[tokio::test]
async fn cancelling_a_captured_gateway_order_credits_and_flags_a_refund() {
    let db = new_db().await;
    let api = flow_api(&db);
    let gadget = seed_product(&db, "Gadget", Money::from_whole(20), 5).await;

    let order = api
        .process_new_order(NewOrder::gateway(
            "cust-1".to_string(),
            one(gadget.id, 3),
            shipping_address(),
            "gw-1".to_string(),
        ))
        .await
        .unwrap();
    api.payment_captured("gw-1", "evt-1", "pay-1").await.unwrap();
    assert_eq!(stock_of(&db, gadget.id).await, 2);

    let cancelled = api.cancel_order(&order.order_id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatusType::Refunded);
    assert_eq!(stock_of(&db, gadget.id).await, 5);
}

#[tokio::test]
async fn capture_refreshes_the_line_item_snapshot() {
    let db = new_db().await;
    let api = flow_api(&db);
    let gadget = seed_product(&db, "Gadget", Money::from_whole(20), 5).await;

    let order = api
        .process_new_order(NewOrder::gateway(
            "cust-1".to_string(),
            one(gadget.id, 1),
            shipping_address(),
            "gw-1".to_string(),
        ))
        .await
        .unwrap();

    // The catalog changes between checkout and capture. The customer pays what the catalog said
    // when the money moved.
    db.upsert_product(
        Some(gadget.id),
        storefront_engine::db_types::NewProduct {
            name: "Gadget".to_string(),
            price: Money::from_whole(25),
            stock: 0,
            category: "general".to_string(),
        },
    )
    .await
    .unwrap();

    let outcome = api.payment_captured("gw-1", "evt-1", "pay-1").await.unwrap();
    assert_eq!(outcome.order().total_price, Money::from_whole(25));
    let items = db.items_for_order(order.id).await.unwrap();
    assert_eq!(items[0].price, Money::from_whole(25));
}

#[tokio::test]
async fn stale_gateway_orders_are_expired() {
    let db = new_db().await;
    let api = flow_api(&db);
    let gadget = seed_product(&db, "Gadget", Money::from_whole(20), 5).await;

    api.process_new_order(NewOrder::gateway(
        "cust-1".to_string(),
        one(gadget.id, 2),
        shipping_address(),
        "gw-1".to_string(),
    ))
    .await
    .unwrap();
    api.process_new_order(NewOrder::cash_on_delivery("cust-2".to_string(), one(gadget.id, 1), shipping_address()))
        .await
        .unwrap();

    // A cutoff in the future makes the freshly created order count as stale.
    let expired = api.expire_stale_orders(chrono::Duration::seconds(-5)).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].status, OrderStatusType::Cancelled);
    assert_eq!(expired[0].gateway_order_id.as_deref(), Some("gw-1"));
    // The COD order is untouched and the gateway order never held stock.
    assert_eq!(stock_of(&db, gadget.id).await, 4);
}
