mod support;

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use stf_common::Money;
use storefront_engine::{
    db_types::{NewLineItem, NewOrder},
    events::{EventHandlers, EventHooks},
    OrderFlowApi,
};
use support::{new_db, seed_product, shipping_address};

#[tokio::test]
async fn lifecycle_hooks_fire() {
    let db = new_db().await;
    let gadget = seed_product(&db, "Gadget", Money::from_whole(20), 5).await;

    let paid_count = Arc::new(AtomicUsize::new(0));
    let annulled_count = Arc::new(AtomicUsize::new(0));
    let shortfall_count = Arc::new(AtomicUsize::new(0));

    let mut hooks = EventHooks::default();
    let paid = paid_count.clone();
    hooks.on_order_paid(move |ev| {
        let paid = paid.clone();
        Box::pin(async move {
            assert_eq!(ev.order.gateway_payment_id.as_deref(), Some("pay-1"));
            paid.fetch_add(1, Ordering::SeqCst);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let annulled = annulled_count.clone();
    hooks.on_order_annulled(move |_ev| {
        let annulled = annulled.clone();
        Box::pin(async move {
            annulled.fetch_add(1, Ordering::SeqCst);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let shortfall = shortfall_count.clone();
    hooks.on_stock_shortfall(move |ev| {
        let shortfall = shortfall.clone();
        Box::pin(async move {
            assert_eq!(ev.gateway_order_id, "gw-2");
            shortfall.fetch_add(1, Ordering::SeqCst);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });

    let handlers = EventHandlers::new(8, hooks);
    let api = OrderFlowApi::new(db.clone(), handlers.producers());

    // Settled order: fires the paid hook.
    let order = api
        .process_new_order(NewOrder::gateway(
            "cust-1".to_string(),
            vec![NewLineItem { product_id: gadget.id, quantity: 2 }],
            shipping_address(),
            "gw-1".to_string(),
        ))
        .await
        .unwrap();
    api.payment_captured("gw-1", "evt-1", "pay-1").await.unwrap();

    // Cancellation: fires the annulled hook.
    api.cancel_order(&order.order_id).await.unwrap();

    // A capture that cannot be honoured: fires the shortfall hook.
    api.process_new_order(NewOrder::gateway(
        "cust-2".to_string(),
        vec![NewLineItem { product_id: gadget.id, quantity: 99 }],
        shipping_address(),
        "gw-2".to_string(),
    ))
    .await
    .unwrap();
    api.payment_captured("gw-2", "evt-2", "pay-2").await.expect_err("Shortfall expected");

    // Dropping the api drops the producers, which lets the handlers drain and shut down.
    drop(api);
    let EventHandlers { on_order_paid, on_order_annulled, on_stock_shortfall } = handlers;
    on_order_paid.unwrap().start_handler().await;
    on_order_annulled.unwrap().start_handler().await;
    on_stock_shortfall.unwrap().start_handler().await;

    assert_eq!(paid_count.load(Ordering::SeqCst), 1);
    assert_eq!(annulled_count.load(Ordering::SeqCst), 1);
    assert_eq!(shortfall_count.load(Ordering::SeqCst), 1);
}
