use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stf_common::Money;

use crate::db_types::{Order, OrderStatusType, PaymentMethod, PaymentStatusType};

/// A line-item snapshot joined against the live catalog. `name`/`price` are what the customer
/// agreed to; the `current_*` columns are what the catalog says today (absent when the product
/// has been deleted).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ItemView {
    pub product_id: i64,
    pub name: String,
    pub price: Money,
    pub quantity: i64,
    pub current_name: Option<String>,
    pub current_price: Option<Money>,
    pub current_stock: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<ItemView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    pub customer_id: String,
    pub total_orders: Money,
    pub orders: Vec<OrderWithItems>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub customer_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<PaymentStatusType>,
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub statuses: Vec<OrderStatusType>,
}

impl OrderQueryFilter {
    pub fn with_customer_id(mut self, customer_id: String) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatusType) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn created_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.created_before = Some(cutoff);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() &&
            self.payment_method.is_none() &&
            self.payment_status.is_none() &&
            self.created_before.is_none() &&
            self.statuses.is_empty()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(customer_id) = &self.customer_id {
            write!(f, "customer_id: {customer_id}. ")?;
        }
        if let Some(method) = &self.payment_method {
            write!(f, "payment_method: {method}. ")?;
        }
        if let Some(status) = &self.payment_status {
            write!(f, "payment_status: {status}. ")?;
        }
        if let Some(cutoff) = &self.created_before {
            write!(f, "created before {cutoff}. ")?;
        }
        if !self.statuses.is_empty() {
            let statuses = self.statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}
