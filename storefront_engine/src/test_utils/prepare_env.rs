use log::*;

use crate::SqliteDatabase;

pub async fn prepare_test_env() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    memory_db().await
}

/// An in-memory SQLite database with the schema applied. The pool is capped at a single
/// connection: every fresh in-memory connection would otherwise be a brand-new, empty database.
pub async fn memory_db() -> SqliteDatabase {
    SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Error creating in-memory database")
}
