use crate::db_types::Order;

/// The result of applying a `payment.captured` notification. Gateways redeliver events, so an
/// already-settled order is an expected, non-error outcome.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// The capture was applied: stock committed, payment recorded, order confirmed.
    Applied(Order),
    /// This event (or an equivalent one) was seen before; nothing was changed.
    AlreadyProcessed(Order),
}

impl CaptureOutcome {
    pub fn order(&self) -> &Order {
        match self {
            CaptureOutcome::Applied(order) | CaptureOutcome::AlreadyProcessed(order) => order,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, CaptureOutcome::Applied(_))
    }
}
