use crate::{
    db_types::{NewProduct, Product},
    traits::{CatalogManagement, StorefrontError},
};

/// Product catalog access. The storefront's browsing endpoints are a thin layer elsewhere; this
/// API exists for order pricing, seeding and admin tooling.
#[derive(Debug, Clone)]
pub struct CatalogApi<B> {
    db: B,
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub async fn product(&self, product_id: i64) -> Result<Option<Product>, StorefrontError> {
        self.db.product_by_id(product_id).await
    }

    pub async fn products(&self) -> Result<Vec<Product>, StorefrontError> {
        self.db.fetch_products().await
    }

    pub async fn upsert_product(&self, id: Option<i64>, product: NewProduct) -> Result<Product, StorefrontError> {
        self.db.upsert_product(id, product).await
    }
}
