use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use gateway_tools::GatewayApiError;
use storefront_engine::traits::StorefrontError;
use thiserror::Error;

use crate::data_objects::JsonResponse;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Invalid request: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Webhook signature invalid or missing.")]
    InvalidSignature,
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    /// Engine-side rejections of a well-formed request: out of stock, illegal transition, etc.
    #[error("{0}")]
    OrderFlowError(String),
    /// A captured payment could not be fulfilled. Money has moved; returning 5xx makes the
    /// gateway retry while an operator sorts the stock out.
    #[error("Captured payment could not be fulfilled. {0}")]
    CaptureShortfall(String),
    #[error("Could not reach the payment gateway. {0}")]
    GatewayError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::OrderFlowError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingIdentity => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedIdentity(_) => StatusCode::BAD_REQUEST,
            },
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CaptureShortfall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .json(JsonResponse::failure(status, self.to_string()))
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No identity was supplied with this request.")]
    MissingIdentity,
    #[error("Identity headers are malformed. {0}")]
    PoorlyFormattedIdentity(String),
}

impl From<StorefrontError> for ServerError {
    fn from(e: StorefrontError) -> Self {
        match e {
            StorefrontError::ProductNotFound(_) | StorefrontError::OrderNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            StorefrontError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            StorefrontError::OutOfStock { .. } |
            StorefrontError::EmptyOrder |
            StorefrontError::OrderAlreadyExists(_) |
            StorefrontError::InvalidStatusTransition { .. } |
            StorefrontError::CannotCancel(_) |
            StorefrontError::MissingGatewayReference => Self::OrderFlowError(e.to_string()),
        }
    }
}

impl From<GatewayApiError> for ServerError {
    fn from(e: GatewayApiError) -> Self {
        Self::GatewayError(e.to_string())
    }
}
