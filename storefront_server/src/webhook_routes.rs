//----------------------------------------------   Webhooks  ---------------------------------------------------

use actix_web::{web, HttpResponse};
use gateway_tools::{PaymentEvent, PaymentEventType};
use log::*;
use storefront_engine::{
    traits::{OrderManagement, StorefrontDatabase, StorefrontError},
    OrderFlowApi,
};

use crate::{data_objects::JsonResponse, errors::ServerError, route};

route!(payment_webhook => Post "/webhook" impl StorefrontDatabase, OrderManagement);
/// Route handler for payment gateway notifications.
///
/// The surrounding scope verifies the HMAC signature over the raw body before this handler runs;
/// by the time the event is parsed here, it is authentic. Redeliveries are expected — the engine
/// applies each event at most once — so a duplicate is answered with a cheerful 200 rather than
/// an error, which is what stops the gateway from retrying forever.
pub async fn payment_webhook<B>(
    body: web::Json<PaymentEvent>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase + OrderManagement,
{
    let event = body.into_inner();
    trace!("🔔️ Received {:?} for gateway order {}", event.event, event.order_id);
    let result = match event.event {
        PaymentEventType::Captured => {
            let payment_id = event.payment_id.as_deref().ok_or_else(|| {
                ServerError::InvalidRequestBody("payment.captured events must carry a payment_id".to_string())
            })?;
            let outcome = api.payment_captured(&event.order_id, &event.event_id, payment_id).await.map_err(|e| {
                match e {
                    StorefrontError::OrderNotFound(_) => ServerError::NoRecordFound(e.to_string()),
                    // Money moved but stock is short. The flow API has already raised the
                    // operator alert; a 5xx here keeps the gateway retrying.
                    StorefrontError::OutOfStock { .. } => ServerError::CaptureShortfall(e.to_string()),
                    e => ServerError::from(e),
                }
            })?;
            if outcome.was_applied() {
                info!("🔔️ Payment captured. Order {} confirmed.", outcome.order().order_id);
                JsonResponse::success("Payment recorded. Order confirmed.", outcome.order())
            } else {
                info!("🔔️ Duplicate capture event {} ignored.", event.event_id);
                JsonResponse::success("Event already processed.", outcome.order())
            }
        },
        PaymentEventType::Failed => {
            let order = api.payment_failed(&event.order_id, &event.event_id).await.map_err(|e| match e {
                StorefrontError::OrderNotFound(_) => ServerError::NoRecordFound(e.to_string()),
                e => ServerError::from(e),
            })?;
            info!("🔔️ Payment failed for order {}. Order remains retryable.", order.order_id);
            JsonResponse::success("Payment failure recorded.", order)
        },
    };
    Ok(HttpResponse::Ok().json(result))
}
