use thiserror::Error;

use crate::db_types::{OrderId, OrderStatusType};

#[derive(Debug, Clone, Error)]
pub enum StorefrontError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(String),
    #[error("{product} is out of stock: requested {requested}, only {remaining} remaining")]
    OutOfStock { product: String, requested: i64, remaining: i64 },
    #[error("An order must contain at least one line item")]
    EmptyOrder,
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Order status cannot change from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Order cannot be cancelled while its status is {0}")]
    CannotCancel(OrderStatusType),
    #[error("A gateway-backed order requires a gateway order reference")]
    MissingGatewayReference,
}

impl StorefrontError {
    pub fn out_of_stock(product: impl Into<String>, requested: i64, remaining: i64) -> Self {
        Self::OutOfStock { product: product.into(), requested, remaining }
    }
}
