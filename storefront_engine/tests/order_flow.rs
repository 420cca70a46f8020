mod support;

use stf_common::Money;
use storefront_engine::{
    db_types::{NewLineItem, NewOrder, OrderStatusType, PaymentMethod, PaymentStatusType},
    traits::{CatalogManagement, OrderManagement, StorefrontError},
    OrderQueryApi,
};
use support::{flow_api, new_db, seed_product, shipping_address, stock_of};

fn items(entries: &[(i64, i64)]) -> Vec<NewLineItem> {
    entries.iter().map(|&(product_id, quantity)| NewLineItem { product_id, quantity }).collect()
}

#[tokio::test]
async fn cod_order_commits_stock_and_snapshots_prices() {
    let db = new_db().await;
    let api = flow_api(&db);
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 5).await;

    let order = api
        .process_new_order(NewOrder::cash_on_delivery(
            "cust-1".to_string(),
            items(&[(widget.id, 3)]),
            shipping_address(),
        ))
        .await
        .expect("COD order should succeed");

    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_method, PaymentMethod::CashOnDelivery);
    assert_eq!(order.payment_status, PaymentStatusType::CashOnDelivery);
    assert_eq!(order.total_price, Money::from_whole(30));
    assert!(order.stock_committed);
    assert_eq!(stock_of(&db, widget.id).await, 2);

    let stored_items = db.items_for_order(order.id).await.unwrap();
    assert_eq!(stored_items.len(), 1);
    assert_eq!(stored_items[0].name, "Widget");
    assert_eq!(stored_items[0].price, Money::from_whole(10));
    assert_eq!(stored_items[0].quantity, 3);
}

#[tokio::test]
async fn cod_stock_commitment_is_all_or_nothing() {
    let db = new_db().await;
    let api = flow_api(&db);
    let plenty = seed_product(&db, "Plenty", Money::from_whole(5), 5).await;
    let scarce = seed_product(&db, "Scarce", Money::from_whole(7), 1).await;

    let err = api
        .process_new_order(NewOrder::cash_on_delivery(
            "cust-1".to_string(),
            items(&[(plenty.id, 2), (scarce.id, 3)]),
            shipping_address(),
        ))
        .await
        .expect_err("Order should fail on the scarce product");

    match err {
        StorefrontError::OutOfStock { product, requested, remaining } => {
            assert_eq!(product, "Scarce");
            assert_eq!(requested, 3);
            assert_eq!(remaining, 1);
        },
        e => panic!("Expected OutOfStock, got {e}"),
    }
    // The decrement on the first product must not survive the failure.
    assert_eq!(stock_of(&db, plenty.id).await, 5);
    assert_eq!(stock_of(&db, scarce.id).await, 1);
}

#[tokio::test]
async fn orders_require_at_least_one_item() {
    let db = new_db().await;
    let api = flow_api(&db);
    let err = api
        .process_new_order(NewOrder::cash_on_delivery("cust-1".to_string(), vec![], shipping_address()))
        .await
        .expect_err("Empty order must be rejected");
    assert!(matches!(err, StorefrontError::EmptyOrder));
}

#[tokio::test]
async fn unknown_products_are_rejected() {
    let db = new_db().await;
    let api = flow_api(&db);
    let err = api
        .process_new_order(NewOrder::cash_on_delivery("cust-1".to_string(), items(&[(999, 1)]), shipping_address()))
        .await
        .expect_err("Unknown product must be rejected");
    assert!(matches!(err, StorefrontError::ProductNotFound(999)));
}

#[tokio::test]
async fn gateway_orders_do_not_touch_stock_at_creation() {
    let db = new_db().await;
    let api = flow_api(&db);
    let widget = seed_product(&db, "Widget", Money::from_whole(20), 2).await;

    let order = api
        .process_new_order(NewOrder::gateway(
            "cust-2".to_string(),
            items(&[(widget.id, 2)]),
            shipping_address(),
            "gw-100".to_string(),
        ))
        .await
        .expect("Gateway order should succeed");

    assert_eq!(order.payment_status, PaymentStatusType::Pending);
    assert_eq!(order.gateway_order_id.as_deref(), Some("gw-100"));
    assert!(!order.stock_committed);
    assert_eq!(order.total_price, Money::from_whole(40));
    assert_eq!(stock_of(&db, widget.id).await, 2);
}

#[tokio::test]
async fn gateway_orders_require_a_gateway_reference() {
    let db = new_db().await;
    let api = flow_api(&db);
    let widget = seed_product(&db, "Widget", Money::from_whole(20), 2).await;

    let mut order =
        NewOrder::gateway("cust-2".to_string(), items(&[(widget.id, 1)]), shipping_address(), "gw-1".to_string());
    order.gateway_order_id = None;
    let err = api.process_new_order(order).await.expect_err("Missing gateway reference must be rejected");
    assert!(matches!(err, StorefrontError::MissingGatewayReference));
}

#[tokio::test]
async fn cancelling_a_cod_order_restores_stock_exactly_once() {
    let db = new_db().await;
    let api = flow_api(&db);
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 5).await;

    let order = api
        .process_new_order(NewOrder::cash_on_delivery(
            "cust-1".to_string(),
            items(&[(widget.id, 3)]),
            shipping_address(),
        ))
        .await
        .unwrap();
    assert_eq!(stock_of(&db, widget.id).await, 2);

    let cancelled = api.cancel_order(&order.order_id).await.expect("Cancellation should succeed");
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
    assert!(!cancelled.stock_committed);
    assert_eq!(stock_of(&db, widget.id).await, 5);

    // A second cancellation must fail and must not credit stock again.
    let err = api.cancel_order(&order.order_id).await.expect_err("Double cancellation must fail");
    match err {
        StorefrontError::CannotCancel(status) => assert_eq!(status, OrderStatusType::Cancelled),
        e => panic!("Expected CannotCancel, got {e}"),
    }
    assert_eq!(stock_of(&db, widget.id).await, 5);
}

#[tokio::test]
async fn shipped_orders_cannot_be_cancelled() {
    let db = new_db().await;
    let api = flow_api(&db);
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 5).await;

    let order = api
        .process_new_order(NewOrder::cash_on_delivery(
            "cust-1".to_string(),
            items(&[(widget.id, 2)]),
            shipping_address(),
        ))
        .await
        .unwrap();
    api.set_order_status(&order.order_id, OrderStatusType::Shipped).await.unwrap();

    let err = api.cancel_order(&order.order_id).await.expect_err("Shipped orders must not be cancellable");
    match err {
        StorefrontError::CannotCancel(status) => assert_eq!(status, OrderStatusType::Shipped),
        e => panic!("Expected CannotCancel, got {e}"),
    }
    // Stock stays committed.
    assert_eq!(stock_of(&db, widget.id).await, 3);
}

#[tokio::test]
async fn admin_status_changes_follow_the_transition_table() {
    let db = new_db().await;
    let api = flow_api(&db);
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 5).await;

    let order = api
        .process_new_order(NewOrder::cash_on_delivery(
            "cust-1".to_string(),
            items(&[(widget.id, 1)]),
            shipping_address(),
        ))
        .await
        .unwrap();

    // Forward jump is a legal admin override.
    let delivered = api.set_order_status(&order.order_id, OrderStatusType::Delivered).await.unwrap();
    assert_eq!(delivered.status, OrderStatusType::Delivered);

    // Delivered only moves to Returned.
    let err = api
        .set_order_status(&order.order_id, OrderStatusType::Confirmed)
        .await
        .expect_err("Delivered -> Confirmed must be rejected");
    match err {
        StorefrontError::InvalidStatusTransition { from, to } => {
            assert_eq!(from, OrderStatusType::Delivered);
            assert_eq!(to, OrderStatusType::Confirmed);
        },
        e => panic!("Expected InvalidStatusTransition, got {e}"),
    }

    let returned = api.set_order_status(&order.order_id, OrderStatusType::Returned).await.unwrap();
    assert_eq!(returned.status, OrderStatusType::Returned);
}

#[tokio::test]
async fn admin_cancellation_goes_through_the_cancel_flow() {
    let db = new_db().await;
    let api = flow_api(&db);
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 4).await;

    let order = api
        .process_new_order(NewOrder::cash_on_delivery(
            "cust-1".to_string(),
            items(&[(widget.id, 4)]),
            shipping_address(),
        ))
        .await
        .unwrap();
    assert_eq!(stock_of(&db, widget.id).await, 0);

    let cancelled = api.set_order_status(&order.order_id, OrderStatusType::Cancelled).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
    // The stock credit cannot be bypassed by using the admin endpoint.
    assert_eq!(stock_of(&db, widget.id).await, 4);
}

#[tokio::test]
async fn catalog_edits_never_rewrite_order_history() {
    let db = new_db().await;
    let api = flow_api(&db);
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 5).await;

    let order = api
        .process_new_order(NewOrder::cash_on_delivery(
            "cust-1".to_string(),
            items(&[(widget.id, 1)]),
            shipping_address(),
        ))
        .await
        .unwrap();

    // Reprice and rename the product after the fact.
    db.upsert_product(
        Some(widget.id),
        storefront_engine::db_types::NewProduct {
            name: "Widget Mk II".to_string(),
            price: Money::from_whole(99),
            stock: 0,
            category: "general".to_string(),
        },
    )
    .await
    .unwrap();

    let stored = db.items_for_order(order.id).await.unwrap();
    assert_eq!(stored[0].name, "Widget");
    assert_eq!(stored[0].price, Money::from_whole(10));

    // The display view carries both the frozen snapshot and the current catalog data.
    let views = db.item_views_for_order(order.id).await.unwrap();
    assert_eq!(views[0].price, Money::from_whole(10));
    assert_eq!(views[0].current_name.as_deref(), Some("Widget Mk II"));
    assert_eq!(views[0].current_price, Some(Money::from_whole(99)));
}

#[tokio::test]
async fn customers_only_see_their_own_orders() {
    let db = new_db().await;
    let api = flow_api(&db);
    let queries = OrderQueryApi::new(db.clone());
    let widget = seed_product(&db, "Widget", Money::from_whole(10), 10).await;

    for customer in ["alice", "bob", "alice"] {
        api.process_new_order(NewOrder::cash_on_delivery(
            customer.to_string(),
            items(&[(widget.id, 1)]),
            shipping_address(),
        ))
        .await
        .unwrap();
    }

    let mine = queries.orders_for_customer("alice").await.unwrap();
    assert_eq!(mine.orders.len(), 2);
    assert_eq!(mine.total_orders, Money::from_whole(20));
    assert!(mine.orders.iter().all(|o| o.order.customer_id == "alice"));

    let all = queries.all_orders().await.unwrap();
    assert_eq!(all.len(), 3);
}
