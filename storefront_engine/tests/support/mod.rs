#![allow(dead_code)]

use stf_common::Money;
use storefront_engine::{
    db_types::{NewProduct, Product, ShippingAddress},
    events::EventProducers,
    CatalogApi,
    OrderFlowApi,
    SqliteDatabase,
};

/// A fresh in-memory database with the schema applied. The pool is capped at one connection;
/// every new in-memory connection would otherwise be a brand-new, empty database.
pub async fn new_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Error creating in-memory database")
}

pub fn flow_api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), EventProducers::default())
}

pub async fn seed_product(db: &SqliteDatabase, name: &str, price: Money, stock: i64) -> Product {
    CatalogApi::new(db.clone())
        .upsert_product(None, NewProduct { name: name.to_string(), price, stock, category: "general".to_string() })
        .await
        .expect("Error seeding product")
}

pub async fn stock_of(db: &SqliteDatabase, product_id: i64) -> i64 {
    CatalogApi::new(db.clone())
        .product(product_id)
        .await
        .expect("Error fetching product")
        .expect("Product missing")
        .stock
}

pub fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        name: "Ada Lovelace".to_string(),
        street: "12 Analytical Row".to_string(),
        city: "London".to_string(),
        state: None,
        postal_code: "N1 9GU".to_string(),
        country: "GB".to_string(),
    }
}
