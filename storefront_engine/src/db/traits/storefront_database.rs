use chrono::Duration;
use stf_common::Money;

use crate::{
    db_types::{NewLineItem, NewOrder, Order, OrderId, OrderStatusType},
    traits::{CaptureOutcome, StorefrontError},
};

/// This trait defines the highest level of behaviour for backends supporting the storefront
/// engine: order creation, payment settlement and the stock movements they imply.
///
/// Implementations must guarantee:
/// * Stock is only ever mutated conditionally ("decrement by N only if stock ≥ N"); two
///   concurrent checkouts against the same product cannot drive stock negative.
/// * Multi-item stock commitment is all-or-nothing. If any line item cannot be satisfied, no
///   decrement from the same request survives.
/// * Payment capture is idempotent. Replaying a delivery never double-decrements stock.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Creates a cash-on-delivery order. In a single atomic transaction, every line item's
    /// product is re-read, its stock conditionally decremented and its name/price snapshotted
    /// into the order. Fails with [`StorefrontError::OutOfStock`] (and no surviving stock
    /// changes) if any item cannot be satisfied.
    async fn create_cod_order(&self, order: NewOrder) -> Result<Order, StorefrontError>;

    /// Creates a gateway-backed order. No stock is touched; line items are snapshotted at their
    /// current catalog values and the gateway's external order reference is recorded. Stock is
    /// committed later, by [`Self::confirm_gateway_payment`].
    async fn create_gateway_order(&self, order: NewOrder) -> Result<Order, StorefrontError>;

    /// Prices a prospective set of line items at current catalog values, without reserving
    /// anything. Used to open the remote gateway order before the local order is persisted.
    async fn price_items(&self, items: &[NewLineItem]) -> Result<Money, StorefrontError>;

    /// Applies a `payment.captured` notification to the order carrying this gateway order
    /// reference. Records `event_id` in the idempotency ledger; a redelivery (ledger hit, or an
    /// order that is already paid) short-circuits to [`CaptureOutcome::AlreadyProcessed`].
    /// On first delivery: each line item's stock is conditionally decremented, the snapshot is
    /// refreshed from the current catalog, the payment id is stored, and the order moves to
    /// `Confirmed`/`Paid`. A stock shortfall aborts the whole transaction.
    async fn confirm_gateway_payment(
        &self,
        gateway_order_id: &str,
        event_id: &str,
        payment_id: &str,
    ) -> Result<CaptureOutcome, StorefrontError>;

    /// Applies a `payment.failed` notification: payment status becomes `Failed` and the order
    /// returns to `Pending` so that the customer can retry.
    async fn fail_gateway_payment(&self, gateway_order_id: &str, event_id: &str) -> Result<Order, StorefrontError>;

    /// Cancels an order. Legal only while the order is `Pending` or `Confirmed`; any other
    /// current status yields [`StorefrontError::CannotCancel`]. Stock is credited back exactly
    /// once, and only if this order actually committed stock; products that have since been
    /// deleted are skipped.
    async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, StorefrontError>;

    /// Sets an order's status without side effects. Callers are responsible for checking the
    /// transition table first and for routing `Cancelled` through [`Self::cancel_order`].
    async fn set_order_status(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, StorefrontError>;

    /// Returns gateway orders that are still awaiting payment capture and were created more than
    /// `older_than` ago. Fodder for the expiry worker.
    async fn fetch_stale_gateway_orders(&self, older_than: Duration) -> Result<Vec<Order>, StorefrontError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StorefrontError> {
        Ok(())
    }
}
