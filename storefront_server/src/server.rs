use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::FutureExt;
use futures::future::ok;
use gateway_tools::GatewayApi;
use log::{error, info, warn};
use storefront_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    OrderFlowApi,
    OrderQueryApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    helpers::get_remote_ip,
    routes::{
        health,
        AllOrdersRoute,
        CancelOrderRoute,
        CreateOrderRoute,
        MyOrdersRoute,
        UpdateOrderStatusRoute,
    },
    webhook_routes::PaymentWebhookRoute,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    // The default operator-alert path for post-capture stock shortfalls is an error-level log
    // line. Deployments that want a pager instead subscribe their own hook here.
    let mut hooks = EventHooks::default();
    hooks.on_stock_shortfall(|ev| {
        Box::pin(async move {
            error!(
                "🚨️ OPERATOR ALERT: payment {} on gateway order {} was captured but could not be fulfilled: {}",
                ev.payment_id, ev.gateway_order_id, ev.detail
            );
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(128, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let _expiry_handle = start_expiry_worker(db.clone(), producers.clone(), config.unpaid_order_timeout);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let gateway_api =
        GatewayApi::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let queries_api = OrderQueryApi::new(db.clone());
        let json_config = web::JsonConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sfs::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(queries_api))
            .app_data(web::Data::new(gateway_api.clone()))
            .app_data(json_config);
        // Routes that require a resolved caller identity
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(AllOrdersRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new());
        // The webhook scope: optional IP whitelist first, then mandatory signature verification
        // over the raw body. Only then is the payload parsed.
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let whitelist = config.webhook.whitelist.clone();
        let payments_scope = web::scope("/payments")
            .wrap(crate::middleware::HmacMiddlewareFactory::new(
                &config.webhook.hmac_header,
                config.webhook.hmac_secret.clone(),
                config.webhook.hmac_checks,
            ))
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
                let allowed = match (&whitelist, peer_ip) {
                    (None, _) => true,
                    (Some(whitelist), Some(ip)) => {
                        info!("Webhook delivery from {ip}");
                        whitelist.contains(&ip)
                    },
                    (Some(_), None) => {
                        warn!("No IP address found for webhook delivery. Denying access.");
                        false
                    },
                };
                if allowed {
                    srv.call(req).boxed_local()
                } else {
                    ok(req.error_response(ServerError::InsufficientPermissions(
                        "This address may not deliver webhooks".to_string(),
                    )))
                    .boxed_local()
                }
            })
            .service(PaymentWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(payments_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
