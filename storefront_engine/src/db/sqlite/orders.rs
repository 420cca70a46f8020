use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{FromRow, QueryBuilder, SqliteConnection};
use stf_common::Money;

use crate::{
    db_types::{
        LineItem,
        NewOrder,
        Order,
        OrderId,
        OrderStatusType,
        PaymentMethod,
        PaymentStatusType,
    },
    order_objects::{ItemView, OrderQueryFilter},
    traits::StorefrontError,
};

const ORDER_COLUMNS: &str = "id, order_id, customer_id, total_price, shipping_address, status, payment_method, \
                             payment_status, gateway_order_id, gateway_payment_id, stock_committed, created_at, \
                             updated_at";

/// Raw row shape. The shipping address is stored as a JSON blob and parsed on the way out.
#[derive(Debug, FromRow)]
struct OrderRow {
    id: i64,
    order_id: OrderId,
    customer_id: String,
    total_price: Money,
    shipping_address: String,
    status: OrderStatusType,
    payment_method: PaymentMethod,
    payment_status: PaymentStatusType,
    gateway_order_id: Option<String>,
    gateway_payment_id: Option<String>,
    stock_committed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, StorefrontError> {
        let shipping_address = serde_json::from_str(&self.shipping_address)
            .map_err(|e| StorefrontError::DatabaseError(format!("Corrupt shipping address on order {}: {e}", self.id)))?;
        Ok(Order {
            id: self.id,
            order_id: self.order_id,
            customer_id: self.customer_id,
            total_price: self.total_price,
            shipping_address,
            status: self.status,
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            gateway_order_id: self.gateway_order_id,
            gateway_payment_id: self.gateway_payment_id,
            stock_committed: self.stock_committed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// A line item with its name and price pinned, ready for insertion.
#[derive(Debug, Clone)]
pub struct SnapshotItem {
    pub product_id: i64,
    pub name: String,
    pub price: Money,
    pub quantity: i64,
}

pub async fn insert_order(
    order: &NewOrder,
    payment_status: PaymentStatusType,
    stock_committed: bool,
    items: &[SnapshotItem],
    total_price: Money,
    conn: &mut SqliteConnection,
) -> Result<i64, StorefrontError> {
    let shipping_address = serde_json::to_string(&order.shipping_address)
        .map_err(|e| StorefrontError::DatabaseError(format!("Could not serialize shipping address: {e}")))?;
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO orders (
            order_id,
            customer_id,
            total_price,
            shipping_address,
            status,
            payment_method,
            payment_status,
            gateway_order_id,
            stock_committed
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.customer_id)
    .bind(total_price)
    .bind(shipping_address)
    .bind(OrderStatusType::Pending)
    .bind(order.payment_method)
    .bind(payment_status)
    .bind(order.gateway_order_id.as_deref())
    .bind(stock_committed)
    .fetch_one(&mut *conn)
    .await?;
    let id = row.0;
    for item in items {
        sqlx::query("INSERT INTO order_items (order_id, product_id, name, price, quantity) VALUES (?, ?, ?, ?, ?)")
            .bind(id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.price)
            .bind(item.quantity)
            .execute(&mut *conn)
            .await?;
    }
    Ok(id)
}

pub async fn order_id_exists(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, StorefrontError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM orders WHERE order_id = ?")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

pub async fn fetch_order_by_pk(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, StorefrontError> {
    let row = sqlx::query_as::<_, OrderRow>(
        "SELECT id, order_id, customer_id, total_price, shipping_address, status, payment_method, payment_status, \
         gateway_order_id, gateway_payment_id, stock_committed, created_at, updated_at FROM orders WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    row.map(OrderRow::into_order).transpose()
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorefrontError> {
    let row = sqlx::query_as::<_, OrderRow>(
        "SELECT id, order_id, customer_id, total_price, shipping_address, status, payment_method, payment_status, \
         gateway_order_id, gateway_payment_id, stock_committed, created_at, updated_at FROM orders WHERE order_id = ?",
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    row.map(OrderRow::into_order).transpose()
}

pub async fn fetch_order_by_gateway_id(
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorefrontError> {
    let row = sqlx::query_as::<_, OrderRow>(
        "SELECT id, order_id, customer_id, total_price, shipping_address, status, payment_method, payment_status, \
         gateway_order_id, gateway_payment_id, stock_committed, created_at, updated_at FROM orders WHERE \
         gateway_order_id = ?",
    )
    .bind(gateway_order_id)
    .fetch_optional(conn)
    .await?;
    row.map(OrderRow::into_order).transpose()
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at` in ascending order.
pub async fn fetch_orders(
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, StorefrontError> {
    let mut builder = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders "));
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(customer_id) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(customer_id);
    }
    if let Some(method) = query.payment_method {
        where_clause.push("payment_method = ");
        where_clause.push_bind_unseparated(method.to_string());
    }
    if let Some(payment_status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(payment_status.to_string());
    }
    if let Some(cutoff) = query.created_before {
        // Normalise both sides: CURRENT_TIMESTAMP and a bound chrono value do not share a
        // lexicographic format.
        where_clause.push("datetime(created_at) < datetime(");
        where_clause.push_bind_unseparated(cutoff.format("%Y-%m-%d %H:%M:%S").to_string());
        where_clause.push_unseparated(")");
    }
    if !query.statuses.is_empty() {
        let statuses = query.statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("📦️ Executing query: {}", builder.sql());
    let rows = builder.build_query_as::<OrderRow>().fetch_all(conn).await?;
    rows.into_iter().map(OrderRow::into_order).collect()
}

pub async fn items_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LineItem>, StorefrontError> {
    let items = sqlx::query_as::<_, LineItem>(
        "SELECT id, order_id, product_id, name, price, quantity FROM order_items WHERE order_id = ? ORDER BY id ASC",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// The stored snapshot joined against the live catalog. Deleted products come back with no
/// current data; the snapshot columns are untouched either way.
pub async fn item_views_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ItemView>, StorefrontError> {
    let items = sqlx::query_as::<_, ItemView>(
        r#"
        SELECT
            oi.product_id,
            oi.name,
            oi.price,
            oi.quantity,
            p.name AS current_name,
            p.price AS current_price,
            p.stock AS current_stock
        FROM order_items oi
        LEFT JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = ?
        ORDER BY oi.id ASC
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

pub async fn update_item_snapshot(
    item_id: i64,
    name: &str,
    price: Money,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    sqlx::query("UPDATE order_items SET name = ?, price = ? WHERE id = ?")
        .bind(name)
        .bind(price)
        .bind(item_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) async fn update_order_status(
    id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    sqlx::query("UPDATE orders SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) async fn mark_paid(
    id: i64,
    payment_id: &str,
    total_price: Money,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    sqlx::query(
        "UPDATE orders SET status = ?, payment_status = ?, gateway_payment_id = ?, total_price = ?, \
         stock_committed = 1, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(OrderStatusType::Confirmed)
    .bind(PaymentStatusType::Paid)
    .bind(payment_id)
    .bind(total_price)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn mark_payment_failed(id: i64, conn: &mut SqliteConnection) -> Result<(), StorefrontError> {
    sqlx::query(
        "UPDATE orders SET status = ?, payment_status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(OrderStatusType::Pending)
    .bind(PaymentStatusType::Failed)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn mark_cancelled(
    id: i64,
    payment_status: PaymentStatusType,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    sqlx::query(
        "UPDATE orders SET status = ?, payment_status = ?, stock_committed = 0, updated_at = CURRENT_TIMESTAMP \
         WHERE id = ?",
    )
    .bind(OrderStatusType::Cancelled)
    .bind(payment_status)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Records a webhook delivery in the idempotency ledger. Returns `false` when the event id has
/// been seen before.
pub async fn record_webhook_event(
    event_id: &str,
    order_id: i64,
    event_type: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, StorefrontError> {
    let res = sqlx::query(
        "INSERT INTO webhook_events (event_id, order_id, event_type) VALUES (?, ?, ?) ON CONFLICT (event_id) DO NOTHING",
    )
    .bind(event_id)
    .bind(order_id)
    .bind(event_type)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}
