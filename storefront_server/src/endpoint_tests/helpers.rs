use actix_web::{
    body::MessageBody,
    dev::ServiceResponse,
    http::StatusCode,
    test,
    web,
    web::ServiceConfig,
};
use gateway_tools::{GatewayApi, GatewayConfig};
use serde_json::Value;
use stf_common::{Money, Secret};
use storefront_engine::{
    db_types::{NewProduct, Product},
    events::EventProducers,
    traits::CatalogManagement,
    OrderFlowApi,
    OrderQueryApi,
    SqliteDatabase,
};

use crate::{
    errors::ServerError,
    middleware::HmacMiddlewareFactory,
    routes::{AllOrdersRoute, CancelOrderRoute, CreateOrderRoute, MyOrdersRoute, UpdateOrderStatusRoute},
    webhook_routes::PaymentWebhookRoute,
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_endpoint_tests";

pub async fn test_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Error creating in-memory database")
}

pub async fn seed_product(db: &SqliteDatabase, name: &str, price: Money, stock: i64) -> Product {
    db.upsert_product(None, NewProduct { name: name.to_string(), price, stock, category: "general".to_string() })
        .await
        .expect("Error seeding product")
}

pub fn flow_api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), EventProducers::default())
}

/// Registers the customer/admin API routes against a real in-memory backend. The gateway client
/// points at a dead URL; tests that go through it are the engine tests' problem, not these.
pub fn configure_api(db: &SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    let db = db.clone();
    move |cfg: &mut ServiceConfig| {
        let gateway = GatewayApi::new(GatewayConfig::default()).expect("Gateway client");
        let json_config = web::JsonConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into());
        cfg.app_data(web::Data::new(OrderFlowApi::new(db.clone(), EventProducers::default())))
            .app_data(web::Data::new(OrderQueryApi::new(db.clone())))
            .app_data(web::Data::new(gateway))
            .app_data(json_config)
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(AllOrdersRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new());
    }
}

/// Registers the webhook scope with signature verification enabled, exactly as the real server
/// wires it.
pub fn configure_webhook(db: &SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    let db = db.clone();
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db.clone(), EventProducers::default()))).service(
            web::scope("/payments")
                .wrap(HmacMiddlewareFactory::new("x-signature", Secret::new(TEST_WEBHOOK_SECRET.to_string()), true))
                .service(PaymentWebhookRoute::<SqliteDatabase>::new()),
        );
    }
}

pub async fn into_json<B>(res: ServiceResponse<B>) -> (StatusCode, Value)
where
    B: MessageBody,
    B::Error: std::fmt::Debug,
{
    let status = res.status();
    let body = test::read_body(res).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub fn shipping_address_json() -> Value {
    serde_json::json!({
        "name": "Ada Lovelace",
        "street": "12 Analytical Row",
        "city": "London",
        "postalCode": "N1 9GU",
        "country": "GB"
    })
}
