use std::fmt::Display;

use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storefront_engine::db_types::{NewLineItem, OrderStatusType, PaymentMethod, ShippingAddress};

/// The uniform response envelope every endpoint answers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonResponse {
    pub status_code: u16,
    pub message: String,
    pub success: bool,
    pub data: Value,
}

impl JsonResponse {
    pub fn new<S: Display, T: Serialize>(status: StatusCode, message: S, data: T) -> Self {
        let data = serde_json::to_value(data).unwrap_or(Value::Null);
        Self { status_code: status.as_u16(), message: message.to_string(), success: status.as_u16() < 400, data }
    }

    pub fn success<S: Display, T: Serialize>(message: S, data: T) -> Self {
        Self::new(StatusCode::OK, message, data)
    }

    pub fn created<S: Display, T: Serialize>(message: S, data: T) -> Self {
        Self::new(StatusCode::CREATED, message, data)
    }

    pub fn failure<S: Display>(status: StatusCode, message: S) -> Self {
        Self::new(status, message, Value::Null)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderRequest {
    pub items: Vec<NewLineItem>,
    #[serde(rename = "shippingAddress")]
    pub shipping_address: ShippingAddress,
    pub payment: PaymentMethod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusUpdate {
    #[serde(rename = "orderStatus")]
    pub order_status: OrderStatusType,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn envelope_success_tracks_status_code() {
        let ok = JsonResponse::success("done", 42);
        assert!(ok.success);
        assert_eq!(ok.status_code, 200);
        let err = JsonResponse::failure(StatusCode::BAD_REQUEST, "nope");
        assert!(!err.success);
        assert_eq!(err.status_code, 400);
        assert_eq!(err.data, Value::Null);
    }

    #[test]
    fn new_order_request_accepts_spec_payment_labels() {
        let body = r#"{
            "items": [{"product": 1, "quantity": 2}],
            "shippingAddress": {
                "name": "A", "street": "B", "city": "C", "postalCode": "D", "country": "E"
            },
            "payment": "COD"
        }"#;
        let req: NewOrderRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.payment, PaymentMethod::CashOnDelivery);

        let body = body.replace("\"COD\"", "\"Gateway\"");
        let req: NewOrderRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(req.payment, PaymentMethod::Gateway);
    }

    #[test]
    fn unknown_status_values_are_rejected() {
        let err = serde_json::from_str::<OrderStatusUpdate>(r#"{"orderStatus": "teleported"}"#);
        assert!(err.is_err());
        let ok = serde_json::from_str::<OrderStatusUpdate>(r#"{"orderStatus": "shipped"}"#).unwrap();
        assert_eq!(ok.order_status, OrderStatusType::Shipped);
    }
}
