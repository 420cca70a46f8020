//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go
//! into a separate module. Keep this module neat and tidy 🙏
//!
//! Since each worker thread processes its requests sequentially, handlers which block the
//! current thread will stop that worker from processing new requests. All I/O in these handlers
//! (database, gateway) is expressed as futures for that reason.

use actix_web::{get, web, HttpResponse, Responder};
use gateway_tools::GatewayApi;
use log::*;
use storefront_engine::{
    db_types::{NewOrder, OrderId, PaymentMethod, PaymentStatusType},
    traits::{OrderManagement, StorefrontDatabase},
    OrderFlowApi,
    OrderQueryApi,
};

use crate::{
    auth::{Role, UserClaims},
    data_objects::{JsonResponse, NewOrderRequest, OrderStatusUpdate},
    errors::ServerError,
};

// Actix cannot handle generics in handlers, so the service registration is implemented manually
// using the `route!` macro.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>); }
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ ; requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>); }
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ---------------------------------------------------
route!(create_order => Post "/orders" impl StorefrontDatabase, OrderManagement);
/// Route handler for checkout.
///
/// Cash-on-delivery orders commit stock right away. Gateway-backed orders are priced at current
/// catalog values, opened with the gateway, and stored locally with the gateway's order
/// reference; their stock commitment happens when the capture webhook lands.
pub async fn create_order<B>(
    claims: UserClaims,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<GatewayApi>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase + OrderManagement,
{
    let request = body.into_inner();
    debug!("💻️ POST order for {} with {} items ({})", claims.user_id, request.items.len(), request.payment);
    let order = match request.payment {
        PaymentMethod::CashOnDelivery => {
            let new_order = NewOrder::cash_on_delivery(claims.user_id, request.items, request.shipping_address);
            api.process_new_order(new_order).await?
        },
        PaymentMethod::Gateway => {
            let total = api.db().price_items(&request.items).await?;
            let order_id = OrderId::random();
            let remote = gateway.create_order(total, order_id.as_str()).await?;
            let mut new_order =
                NewOrder::gateway(claims.user_id, request.items, request.shipping_address, remote.id);
            new_order.order_id = order_id;
            api.process_new_order(new_order).await?
        },
    };
    info!("💻️ Order {} created", order.order_id);
    Ok(HttpResponse::Created().json(JsonResponse::created("Order created.", order)))
}

//----------------------------------------------   Orders  -----------------------------------------------------
route!(my_orders => Get "/orders" impl OrderManagement);
/// Route handler for the orders endpoint
///
/// Authenticated customers fetch their own orders here; the caller identity comes from the
/// identity headers. Admins use `/admin/orders` to see everything.
pub async fn my_orders<B: OrderManagement>(
    claims: UserClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for {}", claims.user_id);
    let orders = api.orders_for_customer(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Orders fetched successfully.", orders)))
}

route!(all_orders => Get "/admin/orders" impl OrderManagement ; requires [Role::Admin]);
/// Route handler for the admin order listing. Unfiltered; requires the admin role.
pub async fn all_orders<B: OrderManagement>(api: web::Data<OrderQueryApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET all orders");
    let orders = api.all_orders().await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Orders fetched successfully.", orders)))
}

route!(update_order_status => Patch "/admin/orders/{order_id}" impl StorefrontDatabase, OrderManagement ; requires [Role::Admin]);
/// Route handler for admin status changes.
///
/// The body carries one of the six order statuses; anything else fails validation at the
/// deserialization boundary. Legal transitions are enforced by the engine, and a change to
/// `cancelled` runs the full cancellation flow, stock credit included.
pub async fn update_order_status<B>(
    path: web::Path<String>,
    body: web::Json<OrderStatusUpdate>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase + OrderManagement,
{
    let order_id = OrderId::from(path.into_inner());
    let new_status = body.into_inner().order_status;
    debug!("💻️ PATCH order status for {order_id} to {new_status}");
    let order = api.set_order_status(&order_id, new_status).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Order status updated.", order)))
}

route!(cancel_order => Patch "/orders/cancel/{order_id}" impl StorefrontDatabase, OrderManagement);
/// Route handler for order cancellation.
///
/// Customers may cancel their own orders; admins may cancel any. The engine enforces the status
/// rules (only pending/confirmed orders can go) and credits stock back exactly when this order
/// had committed it.
pub async fn cancel_order<B>(
    claims: UserClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
    queries: web::Data<OrderQueryApi<B>>,
    gateway: web::Data<GatewayApi>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase + OrderManagement,
{
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ PATCH cancel order {order_id} for {}", claims.user_id);
    let order = queries
        .order_by_id(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    if order.customer_id != claims.user_id && !claims.is_admin() {
        return Err(ServerError::InsufficientPermissions("You may only cancel your own orders".to_string()));
    }
    let cancelled = api.cancel_order(&order_id).await?;
    // A cancelled order whose payment was already captured needs its money back. The refund
    // request is best-effort: the order is cancelled either way, and a failed call here is an
    // operational follow-up, not a reason to resurrect the order.
    if cancelled.payment_status == PaymentStatusType::Refunded {
        if let Some(payment_id) = cancelled.gateway_payment_id.as_deref() {
            if let Err(e) = gateway.refund_payment(payment_id).await {
                warn!("💻️ Could not request a refund for payment {payment_id}: {e}. Follow up manually.");
            }
        }
    }
    Ok(HttpResponse::Ok().json(JsonResponse::success("Order cancelled.", cancelled)))
}
