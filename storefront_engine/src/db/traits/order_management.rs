use crate::{
    db_types::{LineItem, Order, OrderId},
    order_objects::{ItemView, OrderQueryFilter},
    traits::StorefrontError,
};

/// The `OrderManagement` trait defines the behaviour for querying information about orders in the
/// database backend.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, StorefrontError>;

    async fn order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>, StorefrontError>;

    /// Fetches orders according to the criteria in `query`, ordered by creation time.
    async fn fetch_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StorefrontError>;

    /// The stored line-item snapshot for an order.
    async fn items_for_order(&self, order_id: i64) -> Result<Vec<LineItem>, StorefrontError>;

    /// Line items joined against the *current* catalog, for display. The stored snapshot is
    /// never mutated by this call; products that have been deleted simply carry no current data.
    async fn item_views_for_order(&self, order_id: i64) -> Result<Vec<ItemView>, StorefrontError>;
}
