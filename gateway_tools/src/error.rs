use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize the gateway client. {0}")]
    Initialization(String),
    #[error("Gateway response error: {0}")]
    ResponseError(String),
    #[error("Could not deserialize gateway response: {0}")]
    JsonError(String),
    #[error("Gateway returned {status}: {message}")]
    QueryError { status: u16, message: String },
}
