use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::{debug, warn};
use sqlx::SqlitePool;
use stf_common::Money;

use super::{new_pool, orders, orders::SnapshotItem, products};
use crate::{
    db_types::{
        LineItem,
        NewLineItem,
        NewOrder,
        NewProduct,
        Order,
        OrderId,
        OrderStatusType,
        PaymentMethod,
        PaymentStatusType,
        Product,
    },
    order_objects::{ItemView, OrderQueryFilter},
    traits::{CaptureOutcome, CatalogManagement, OrderManagement, StorefrontDatabase, StorefrontError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, StorefrontError> {
        let url = super::db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StorefrontError> {
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_order_by_pk_or_err(
        id: i64,
        conn: &mut sqlx::SqliteConnection,
    ) -> Result<Order, StorefrontError> {
        orders::fetch_order_by_pk(id, conn)
            .await?
            .ok_or_else(|| StorefrontError::DatabaseError(format!("Order row {id} vanished mid-transaction")))
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_cod_order(&self, order: NewOrder) -> Result<Order, StorefrontError> {
        if order.items.is_empty() {
            return Err(StorefrontError::EmptyOrder);
        }
        let mut tx = self.pool.begin().await?;
        if orders::order_id_exists(&order.order_id, &mut tx).await? {
            return Err(StorefrontError::OrderAlreadyExists(order.order_id));
        }
        let mut snapshots = Vec::with_capacity(order.items.len());
        let mut total_price = Money::default();
        for item in &order.items {
            // Any failure here unwinds the transaction, so earlier decrements do not survive a
            // later shortfall.
            let product = products::try_decrement_stock(item.product_id, item.quantity, &mut tx).await?;
            total_price += product.price * item.quantity;
            snapshots.push(SnapshotItem {
                product_id: product.id,
                name: product.name,
                price: product.price,
                quantity: item.quantity,
            });
        }
        let id =
            orders::insert_order(&order, PaymentStatusType::CashOnDelivery, true, &snapshots, total_price, &mut tx)
                .await?;
        let created = Self::fetch_order_by_pk_or_err(id, &mut tx).await?;
        tx.commit().await?;
        debug!("🧾️ COD order {} created for {} with {} items", created.order_id, created.customer_id, snapshots.len());
        Ok(created)
    }

    async fn create_gateway_order(&self, order: NewOrder) -> Result<Order, StorefrontError> {
        if order.items.is_empty() {
            return Err(StorefrontError::EmptyOrder);
        }
        if order.gateway_order_id.is_none() {
            return Err(StorefrontError::MissingGatewayReference);
        }
        let mut tx = self.pool.begin().await?;
        if orders::order_id_exists(&order.order_id, &mut tx).await? {
            return Err(StorefrontError::OrderAlreadyExists(order.order_id));
        }
        let mut snapshots = Vec::with_capacity(order.items.len());
        let mut total_price = Money::default();
        for item in &order.items {
            let product = products::fetch_product(item.product_id, &mut tx)
                .await?
                .ok_or(StorefrontError::ProductNotFound(item.product_id))?;
            total_price += product.price * item.quantity;
            snapshots.push(SnapshotItem {
                product_id: product.id,
                name: product.name,
                price: product.price,
                quantity: item.quantity,
            });
        }
        let id = orders::insert_order(&order, PaymentStatusType::Pending, false, &snapshots, total_price, &mut tx)
            .await?;
        let created = Self::fetch_order_by_pk_or_err(id, &mut tx).await?;
        tx.commit().await?;
        debug!("🧾️ Gateway order {} created for {} (awaiting capture)", created.order_id, created.customer_id);
        Ok(created)
    }

    async fn price_items(&self, items: &[NewLineItem]) -> Result<Money, StorefrontError> {
        if items.is_empty() {
            return Err(StorefrontError::EmptyOrder);
        }
        let mut conn = self.pool.acquire().await?;
        let mut total = Money::default();
        for item in items {
            let product = products::fetch_product(item.product_id, &mut conn)
                .await?
                .ok_or(StorefrontError::ProductNotFound(item.product_id))?;
            total += product.price * item.quantity;
        }
        Ok(total)
    }

    async fn confirm_gateway_payment(
        &self,
        gateway_order_id: &str,
        event_id: &str,
        payment_id: &str,
    ) -> Result<CaptureOutcome, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_gateway_id(gateway_order_id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(gateway_order_id.to_string()))?;
        if order.payment_status == PaymentStatusType::Paid || order.status == OrderStatusType::Confirmed {
            debug!("💳️ Order {} is already settled. Ignoring redelivery of event {event_id}", order.order_id);
            return Ok(CaptureOutcome::AlreadyProcessed(order));
        }
        if !orders::record_webhook_event(event_id, order.id, "payment.captured", &mut tx).await? {
            debug!("💳️ Event {event_id} for order {} was handled before. Ignoring.", order.order_id);
            return Ok(CaptureOutcome::AlreadyProcessed(order));
        }
        let items = orders::items_for_order(order.id, &mut tx).await?;
        let mut total_price = Money::default();
        for item in &items {
            // The snapshot is refreshed at capture time: the customer pays what the catalog said
            // when the money actually moved. A shortfall unwinds everything, including the
            // ledger entry, so the gateway's next retry can succeed once stock returns.
            let product = products::try_decrement_stock(item.product_id, item.quantity, &mut tx).await?;
            orders::update_item_snapshot(item.id, &product.name, product.price, &mut tx).await?;
            total_price += product.price * item.quantity;
        }
        orders::mark_paid(order.id, payment_id, total_price, &mut tx).await?;
        let updated = Self::fetch_order_by_pk_or_err(order.id, &mut tx).await?;
        tx.commit().await?;
        debug!("💳️ Payment {payment_id} captured for order {}. Order confirmed.", updated.order_id);
        Ok(CaptureOutcome::Applied(updated))
    }

    async fn fail_gateway_payment(&self, gateway_order_id: &str, event_id: &str) -> Result<Order, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_gateway_id(gateway_order_id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(gateway_order_id.to_string()))?;
        if order.payment_status == PaymentStatusType::Paid {
            warn!(
                "💳️ Received payment.failed for order {} which is already paid. Ignoring event {event_id}.",
                order.order_id
            );
            return Ok(order);
        }
        if !orders::record_webhook_event(event_id, order.id, "payment.failed", &mut tx).await? {
            debug!("💳️ Event {event_id} for order {} was handled before. Ignoring.", order.order_id);
            return Ok(order);
        }
        orders::mark_payment_failed(order.id, &mut tx).await?;
        let updated = Self::fetch_order_by_pk_or_err(order.id, &mut tx).await?;
        tx.commit().await?;
        debug!("💳️ Payment failed for order {}. Order is pending again.", updated.order_id);
        Ok(updated)
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(order_id.as_str().to_string()))?;
        if !matches!(order.status, OrderStatusType::Pending | OrderStatusType::Confirmed) {
            return Err(StorefrontError::CannotCancel(order.status));
        }
        if order.stock_committed {
            let items = orders::items_for_order(order.id, &mut tx).await?;
            for item in &items {
                // Credit exactly what this order took out. A product that has been deleted since
                // is skipped; there is no shelf to put the stock back on.
                if !products::credit_stock(item.product_id, item.quantity, &mut tx).await? {
                    debug!(
                        "🧾️ Product #{} from order {} no longer exists. Skipping stock credit.",
                        item.product_id, order.order_id
                    );
                }
            }
        }
        let payment_status = match order.payment_status {
            // The money has been captured; flag the payment for a refund.
            PaymentStatusType::Paid => PaymentStatusType::Refunded,
            other => other,
        };
        orders::mark_cancelled(order.id, payment_status, &mut tx).await?;
        let updated = Self::fetch_order_by_pk_or_err(order.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🧾️ Order {} cancelled (stock credited: {})", updated.order_id, order.stock_committed);
        Ok(updated)
    }

    async fn set_order_status(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(order_id.as_str().to_string()))?;
        orders::update_order_status(order.id, status, &mut tx).await?;
        let updated = Self::fetch_order_by_pk_or_err(order.id, &mut tx).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn fetch_stale_gateway_orders(&self, older_than: Duration) -> Result<Vec<Order>, StorefrontError> {
        let cutoff = Utc::now() - older_than;
        let query = OrderQueryFilter::default()
            .with_payment_method(PaymentMethod::Gateway)
            .with_payment_status(PaymentStatusType::Pending)
            .with_status(OrderStatusType::Pending)
            .created_before(cutoff);
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders(query, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), StorefrontError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_order_id(order_id, &mut conn).await
    }

    async fn order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_gateway_id(gateway_order_id, &mut conn).await
    }

    async fn fetch_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders(query, &mut conn).await
    }

    async fn items_for_order(&self, order_id: i64) -> Result<Vec<LineItem>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::items_for_order(order_id, &mut conn).await
    }

    async fn item_views_for_order(&self, order_id: i64) -> Result<Vec<ItemView>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::item_views_for_order(order_id, &mut conn).await
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn product_by_id(&self, product_id: i64) -> Result<Option<Product>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_product(product_id, &mut conn).await
    }

    async fn fetch_products(&self) -> Result<Vec<Product>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_products(&mut conn).await
    }

    async fn upsert_product(&self, id: Option<i64>, product: NewProduct) -> Result<Product, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        products::upsert_product(id, product, &mut conn).await
    }
}
