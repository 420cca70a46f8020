use log::debug;

use crate::{
    db_types::{Order, OrderId},
    order_objects::{OrderQueryFilter, OrderResult, OrderWithItems},
    traits::{OrderManagement, StorefrontError},
};

/// Read-only order queries: a customer's own orders, the admin view across all customers, and
/// single-order lookups. Line items come back resolved against the current catalog for display;
/// the stored snapshot is never modified here.
#[derive(Debug, Clone)]
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    pub async fn orders_for_customer(&self, customer_id: &str) -> Result<OrderResult, StorefrontError> {
        let filter = OrderQueryFilter::default().with_customer_id(customer_id.to_string());
        let orders = self.db.fetch_orders(filter).await?;
        debug!("📋️ Fetched {} orders for customer {customer_id}", orders.len());
        let mut result = OrderResult {
            customer_id: customer_id.to_string(),
            total_orders: orders.iter().map(|o| o.total_price).sum(),
            orders: Vec::with_capacity(orders.len()),
        };
        for order in orders {
            result.orders.push(self.with_items(order).await?);
        }
        Ok(result)
    }

    pub async fn all_orders(&self) -> Result<Vec<OrderWithItems>, StorefrontError> {
        let orders = self.db.fetch_orders(OrderQueryFilter::default()).await?;
        debug!("📋️ Fetched {} orders (admin view)", orders.len());
        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            result.push(self.with_items(order).await?);
        }
        Ok(result)
    }

    pub async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, StorefrontError> {
        self.db.order_by_id(order_id).await
    }

    async fn with_items(&self, order: Order) -> Result<OrderWithItems, StorefrontError> {
        let items = self.db.item_views_for_order(order.id).await?;
        Ok(OrderWithItems { order, items })
    }
}
