use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use stf_common::Money;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------   OrderStatusType     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been created. Payment has not been captured yet (or the order is COD).
    Pending,
    /// Payment has been captured, or an admin has confirmed the order.
    Confirmed,
    /// The order has left the warehouse.
    Shipped,
    /// The order has reached the customer. Terminal, except for returns.
    Delivered,
    /// The order was cancelled by the customer or an admin. Terminal.
    Cancelled,
    /// The customer returned the order. Terminal.
    Returned,
}

impl OrderStatusType {
    /// The admin status-change table. Forward jumps are deliberately legal (an admin may mark a
    /// pending order delivered without passing through the intermediate states), terminal states
    /// admit no further changes, and `Delivered` can only move to `Returned`.
    pub fn can_transition_to(self, new: OrderStatusType) -> bool {
        use OrderStatusType::*;
        match (self, new) {
            (old, new) if old == new => false,
            (Pending, Confirmed | Shipped | Delivered | Cancelled) => true,
            (Confirmed, Shipped | Delivered | Cancelled) => true,
            (Shipped, Delivered | Returned) => true,
            (Delivered, Returned) => true,
            (_, _) => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatusType::Delivered | OrderStatusType::Cancelled | OrderStatusType::Returned)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Confirmed => write!(f, "Confirmed"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
            OrderStatusType::Returned => write!(f, "Returned"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "returned" => Ok(Self::Returned),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentMethod      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Stock is committed at order-creation time; payment is collected on delivery.
    #[serde(rename = "COD")]
    CashOnDelivery,
    /// Stock commitment is deferred until the gateway reports a captured payment.
    Gateway,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::CashOnDelivery => write!(f, "CashOnDelivery"),
            PaymentMethod::Gateway => write!(f, "Gateway"),
        }
    }
}

//--------------------------------------  PaymentStatusType    -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatusType {
    /// A gateway order that has not seen a capture notification yet.
    Pending,
    Paid,
    Failed,
    Refunded,
    /// COD orders never go through the gateway; they carry this status for their whole life.
    #[serde(rename = "cash-on-delivery")]
    CashOnDelivery,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::Pending => write!(f, "Pending"),
            PaymentStatusType::Paid => write!(f, "Paid"),
            PaymentStatusType::Failed => write!(f, "Failed"),
            PaymentStatusType::Refunded => write!(f, "Refunded"),
            PaymentStatusType::CashOnDelivery => write!(f, "CashOnDelivery"),
        }
    }
}

//--------------------------------------        OrderId        -------------------------------------------------------
/// The public, customer-facing order reference. Internal row ids never leave the engine.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh order reference, e.g. `SF-Q7GK2MWPX4RT`.
    pub fn random() -> Self {
        let suffix: String =
            rand::thread_rng().sample_iter(&Alphanumeric).take(12).map(|c| (c as char).to_ascii_uppercase()).collect();
        Self(format!("SF-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------    ShippingAddress    -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

//--------------------------------------        Product        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: i64,
    #[serde(default)]
    pub category: String,
}

//--------------------------------------       LineItem        -------------------------------------------------------
/// One product-quantity-price triple inside an order. `name` and `price` are frozen at the moment
/// the stock commitment happens, so catalog edits never rewrite order history.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct LineItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub name: String,
    pub price: Money,
    pub quantity: i64,
}

impl LineItem {
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineItem {
    #[serde(rename = "product")]
    pub product_id: i64,
    pub quantity: i64,
}

//--------------------------------------         Order         -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    pub total_price: Money,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatusType,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatusType,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub stock_committed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub customer_id: String,
    pub items: Vec<NewLineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    /// The external order reference assigned by the payment gateway. Required for gateway-backed
    /// orders, always `None` for COD.
    pub gateway_order_id: Option<String>,
}

impl NewOrder {
    pub fn cash_on_delivery(customer_id: String, items: Vec<NewLineItem>, shipping_address: ShippingAddress) -> Self {
        Self {
            order_id: OrderId::random(),
            customer_id,
            items,
            shipping_address,
            payment_method: PaymentMethod::CashOnDelivery,
            gateway_order_id: None,
        }
    }

    pub fn gateway(
        customer_id: String,
        items: Vec<NewLineItem>,
        shipping_address: ShippingAddress,
        gateway_order_id: String,
    ) -> Self {
        Self {
            order_id: OrderId::random(),
            customer_id,
            items,
            shipping_address,
            payment_method: PaymentMethod::Gateway,
            gateway_order_id: Some(gateway_order_id),
        }
    }
}

#[cfg(test)]
mod test {
    use super::OrderStatusType::*;

    #[test]
    fn transition_table() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Delivered));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Returned));
        assert!(Delivered.can_transition_to(Returned));

        assert!(!Pending.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Returned));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Returned.can_transition_to(Confirmed));
        assert!(!Delivered.can_transition_to(Shipped));
    }

    #[test]
    fn terminal_states() {
        assert!(Delivered.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(Returned.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Confirmed.is_terminal());
        assert!(!Shipped.is_terminal());
    }
}
