//! Storefront Engine
//!
//! The storefront engine holds the order, stock and payment lifecycle for the storefront server.
//! It is provider-agnostic: the HTTP layer and the payment-gateway client live elsewhere.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. You should
//!    never need to access the database directly; use the public API instead. The exception is
//!    the data types used in the database, defined in the `db_types` module, which are public.
//! 2. The engine public API ([`mod@sfe_api`]): order flow, order queries and catalog access.
//!    Backends implement the traits in [`mod@db`] to power these APIs.
//!
//! The engine also emits events at the interesting points of the order lifecycle (order paid,
//! order annulled, stock shortfall after capture). A small actor-style hook system lets you
//! subscribe to these and react asynchronously.

mod db;

pub mod db_types;
pub mod events;
mod sfe_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits;
pub use sfe_api::{order_objects, CatalogApi, OrderFlowApi, OrderQueryApi};
