use chrono::Duration;
use log::*;
use storefront_engine::{db_types::Order, events::EventProducers, OrderFlowApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the stale-order expiry worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
///
/// Gateway orders hold no stock while they wait for a capture, but they clutter the books and
/// the customer's order list. Once one has waited longer than the configured timeout it is
/// cancelled through the normal flow (which, having committed no stock, credits none).
pub fn start_expiry_worker(db: SqliteDatabase, producers: EventProducers, unpaid_expiry: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = OrderFlowApi::new(db, producers);
        info!("🕰️ Stale order expiry worker started");
        loop {
            timer.tick().await;
            match api.expire_stale_orders(unpaid_expiry).await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No stale gateway orders to expire"),
                Ok(expired) => {
                    info!("🕰️ {} stale gateway orders expired: {}", expired.len(), order_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running the stale order expiry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] order_id: {} cust_id: {}", o.id, o.order_id, o.customer_id))
        .collect::<Vec<String>>()
        .join(", ")
}
