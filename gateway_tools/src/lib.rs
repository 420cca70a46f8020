//! A minimal REST client for the payment gateway the storefront uses, plus the data objects that
//! cross the wire in both directions: outbound order/refund calls and the inbound webhook
//! payload.

mod api;
mod config;
pub mod data_objects;
mod error;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{PaymentEvent, PaymentEventType, RemoteOrder};
pub use error::GatewayApiError;
