use serde::{Deserialize, Serialize};
use stf_common::Money;

/// The order record as the gateway sees it. `id` is the reference that later webhook deliveries
/// are keyed on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub id: String,
    pub amount: Money,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRemoteOrder {
    pub amount: Money,
    pub currency: String,
    /// Our public order reference, echoed back by the gateway for reconciliation.
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentEventType {
    #[serde(rename = "payment.captured")]
    Captured,
    #[serde(rename = "payment.failed")]
    Failed,
}

/// The webhook payload. The signature over the raw body travels in a header and is checked
/// before this struct ever gets parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub event: PaymentEventType,
    /// Unique per delivery attempt *series*: redeliveries of the same event reuse it.
    pub event_id: String,
    /// The gateway's order id (`RemoteOrder::id`).
    pub order_id: String,
    /// Present on `payment.captured`.
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub amount: Option<Money>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn webhook_payloads_parse() {
        let body = r#"{
            "event": "payment.captured",
            "event_id": "evt_01",
            "order_id": "gw_123",
            "payment_id": "pay_456",
            "amount": 4000
        }"#;
        let ev: PaymentEvent = serde_json::from_str(body).unwrap();
        assert_eq!(ev.event, PaymentEventType::Captured);
        assert_eq!(ev.payment_id.as_deref(), Some("pay_456"));
        assert_eq!(ev.amount, Some(Money::from_cents(4000)));

        let body = r#"{ "event": "payment.failed", "event_id": "evt_02", "order_id": "gw_123" }"#;
        let ev: PaymentEvent = serde_json::from_str(body).unwrap();
        assert_eq!(ev.event, PaymentEventType::Failed);
        assert!(ev.payment_id.is_none());
    }
}
