use crate::{
    db_types::{NewProduct, Product},
    traits::StorefrontError,
};

/// Product catalog queries and the single write path used by seeding and admin tooling. There is
/// deliberately no stock setter here; stock only moves through the order flows on
/// [`super::StorefrontDatabase`].
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn product_by_id(&self, product_id: i64) -> Result<Option<Product>, StorefrontError>;

    async fn fetch_products(&self) -> Result<Vec<Product>, StorefrontError>;

    /// Inserts a product, or updates name/price/category when `id` is given. Returns the stored
    /// product.
    async fn upsert_product(&self, id: Option<i64>, product: NewProduct) -> Result<Product, StorefrontError>;
}
