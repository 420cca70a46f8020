//! SQLite backend for the storefront engine.

mod db;
mod orders;
mod products;

use std::{env, str::FromStr};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

pub use db::SqliteDatabase;
use crate::traits::StorefrontError;

const SQLITE_DB_URL: &str = "sqlite://data/storefront.db";

pub fn db_url() -> String {
    let result = env::var("SFS_DATABASE_URL").unwrap_or_else(|_| {
        info!("SFS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

/// Creates a connection pool and brings the schema up to date. Embedded migrations make a fresh
/// in-memory database immediately usable, which is what the tests rely on.
pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, StorefrontError> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| StorefrontError::DatabaseError(e.to_string()))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

impl From<sqlx::Error> for StorefrontError {
    fn from(e: sqlx::Error) -> Self {
        StorefrontError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StorefrontError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StorefrontError::DatabaseError(e.to_string())
    }
}
