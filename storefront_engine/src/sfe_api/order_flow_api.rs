use std::fmt::Debug;

use chrono::Duration;
use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, PaymentMethod},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent, StockShortfallEvent},
    traits::{CaptureOutcome, OrderManagement, StorefrontDatabase, StorefrontError},
};

/// `OrderFlowApi` is the primary API for mutating orders: checkout, payment-gateway
/// notifications, cancellation and admin status changes. It layers event hooks and the
/// transition rules over the raw database operations.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: StorefrontDatabase + OrderManagement
{
    /// Submit a new order.
    ///
    /// Cash-on-delivery orders commit stock immediately: every line item is checked and
    /// decremented in one all-or-nothing transaction. Gateway-backed orders are stored without
    /// touching stock; commitment happens when [`Self::payment_captured`] fires.
    pub async fn process_new_order(&self, order: NewOrder) -> Result<Order, StorefrontError> {
        let order = match order.payment_method {
            PaymentMethod::CashOnDelivery => self.db.create_cod_order(order).await?,
            PaymentMethod::Gateway => self.db.create_gateway_order(order).await?,
        };
        debug!("🔄️📦️ Order {} ({}) created for customer {}", order.order_id, order.payment_method, order.customer_id);
        Ok(order)
    }

    /// Apply a `payment.captured` notification from the gateway.
    ///
    /// Redeliveries are expected and harmless: the first delivery commits stock and confirms the
    /// order, every later one short-circuits to [`CaptureOutcome::AlreadyProcessed`]. A stock
    /// shortfall at this point means the gateway has taken money we cannot honour yet; the
    /// shortfall hook is fired so an operator gets involved, and the error is returned so the
    /// gateway retries.
    pub async fn payment_captured(
        &self,
        gateway_order_id: &str,
        event_id: &str,
        payment_id: &str,
    ) -> Result<CaptureOutcome, StorefrontError> {
        match self.db.confirm_gateway_payment(gateway_order_id, event_id, payment_id).await {
            Ok(outcome) => {
                if outcome.was_applied() {
                    debug!("🔄️💰️ Payment {payment_id} captured. Order {} confirmed.", outcome.order().order_id);
                    self.call_order_paid_hook(outcome.order()).await;
                } else {
                    debug!("🔄️💰️ Duplicate capture event {event_id} for gateway order {gateway_order_id}. No-op.");
                }
                Ok(outcome)
            },
            Err(e @ StorefrontError::OutOfStock { .. }) => {
                error!(
                    "🚨️ Payment {payment_id} was captured for gateway order {gateway_order_id}, but stock ran out \
                     before fulfilment: {e}. Operator intervention is required."
                );
                self.call_stock_shortfall_hook(StockShortfallEvent {
                    gateway_order_id: gateway_order_id.to_string(),
                    payment_id: payment_id.to_string(),
                    detail: e.to_string(),
                })
                .await;
                Err(e)
            },
            Err(e) => Err(e),
        }
    }

    /// Apply a `payment.failed` notification: the payment is marked failed and the order drops
    /// back to `Pending` so the customer can try again.
    pub async fn payment_failed(&self, gateway_order_id: &str, event_id: &str) -> Result<Order, StorefrontError> {
        let order = self.db.fail_gateway_payment(gateway_order_id, event_id).await?;
        debug!("🔄️💰️ Payment failed for order {}. Status is {}.", order.order_id, order.status);
        Ok(order)
    }

    /// Cancel an order. Legal from `Pending` or `Confirmed` only. Stock that this order actually
    /// committed is credited back exactly once; a gateway order that never saw a capture gains
    /// nothing.
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, StorefrontError> {
        let order = self.db.cancel_order(order_id).await?;
        debug!("🔄️📦️ Order {} cancelled", order.order_id);
        self.call_order_annulled_hook(&order).await;
        Ok(order)
    }

    /// Change an order's status on behalf of an admin.
    ///
    /// The transition table in [`OrderStatusType::can_transition_to`] is enforced: forward jumps
    /// are allowed as a deliberate admin override, terminal states are immutable, and a
    /// transition into `Cancelled` is routed through [`Self::cancel_order`] so the stock-credit
    /// rules cannot be bypassed.
    pub async fn set_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, StorefrontError> {
        if new_status == OrderStatusType::Cancelled {
            return self.cancel_order(order_id).await;
        }
        let order = self
            .db
            .order_by_id(order_id)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(order_id.as_str().to_string()))?;
        if !order.status.can_transition_to(new_status) {
            return Err(StorefrontError::InvalidStatusTransition { from: order.status, to: new_status });
        }
        let updated = self.db.set_order_status(order_id, new_status).await?;
        debug!("🔄️📦️ Order {} moved from {} to {}", updated.order_id, order.status, updated.status);
        Ok(updated)
    }

    /// Cancel gateway orders that have been waiting for a capture for longer than `older_than`.
    /// Returns the orders that were expired. Used by the server's background worker.
    pub async fn expire_stale_orders(&self, older_than: Duration) -> Result<Vec<Order>, StorefrontError> {
        let stale = self.db.fetch_stale_gateway_orders(older_than).await?;
        let mut expired = Vec::with_capacity(stale.len());
        for order in stale {
            match self.cancel_order(&order.order_id).await {
                Ok(cancelled) => expired.push(cancelled),
                // Don't let one stubborn order stall the sweep; it will be retried next tick.
                Err(e) => warn!("🕰️ Could not expire order {}: {e}", order.order_id),
            }
        }
        Ok(expired)
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            trace!("🔄️📦️ Notifying order paid hook subscribers");
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_annulled_producer {
            trace!("🔄️📦️ Notifying order annulled hook subscribers");
            emitter.publish_event(OrderAnnulledEvent::new(order.clone())).await;
        }
    }

    async fn call_stock_shortfall_hook(&self, event: StockShortfallEvent) {
        for emitter in &self.producers.stock_shortfall_producer {
            trace!("🔄️📦️ Notifying stock shortfall hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
