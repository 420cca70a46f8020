use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewProduct, Product},
    traits::StorefrontError,
};

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, StorefrontError> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT id, name, price, stock, category, created_at, updated_at FROM products WHERE id = ?",
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, StorefrontError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT id, name, price, stock, category, created_at, updated_at FROM products ORDER BY id ASC",
    )
    .fetch_all(conn)
    .await?;
    Ok(products)
}

pub async fn upsert_product(
    id: Option<i64>,
    product: NewProduct,
    conn: &mut SqliteConnection,
) -> Result<Product, StorefrontError> {
    let id = match id {
        Some(id) => {
            let res = sqlx::query(
                "UPDATE products SET name = ?, price = ?, category = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            )
            .bind(&product.name)
            .bind(product.price)
            .bind(&product.category)
            .bind(id)
            .execute(&mut *conn)
            .await?;
            if res.rows_affected() == 0 {
                return Err(StorefrontError::ProductNotFound(id));
            }
            id
        },
        None => {
            let row: (i64,) =
                sqlx::query_as("INSERT INTO products (name, price, stock, category) VALUES (?, ?, ?, ?) RETURNING id")
                    .bind(&product.name)
                    .bind(product.price)
                    .bind(product.stock)
                    .bind(&product.category)
                    .fetch_one(&mut *conn)
                    .await?;
            row.0
        },
    };
    let stored = fetch_product(id, conn).await?.ok_or(StorefrontError::ProductNotFound(id))?;
    Ok(stored)
}

/// Atomically decrements stock by `quantity`, but only while enough stock remains. The guard
/// lives in the SQL itself, so concurrent checkouts against the same product serialize on the
/// row and the loser sees the post-decrement count. Returns the product as it stands after the
/// decrement.
pub async fn try_decrement_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, StorefrontError> {
    let res = sqlx::query(
        "UPDATE products SET stock = stock - ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2 AND stock >= ?1",
    )
    .bind(quantity)
    .bind(product_id)
    .execute(&mut *conn)
    .await?;
    let product = fetch_product(product_id, conn).await?.ok_or(StorefrontError::ProductNotFound(product_id))?;
    if res.rows_affected() == 0 {
        return Err(StorefrontError::out_of_stock(product.name, quantity, product.stock));
    }
    debug!("🛒️ Stock for product #{product_id} reduced by {quantity} to {}", product.stock);
    Ok(product)
}

/// Unconditionally credits stock back to a product. Returns `false` when the product no longer
/// exists; cancellation treats that as a skip, not an error.
pub async fn credit_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, StorefrontError> {
    let res = sqlx::query("UPDATE products SET stock = stock + ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(quantity)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}
