use async_trait::async_trait;
use sea_orm::EntityTrait;
use uuid::Uuid;

use super::product_from_entity;
use crate::{
    db::OrmConn, entity::products::Entity as Products, error::AppResult, models::Product,
    repository::CatalogLookup,
};

#[derive(Clone)]
pub struct PgCatalog {
    orm: OrmConn,
}

impl PgCatalog {
    pub fn new(orm: OrmConn) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl CatalogLookup for PgCatalog {
    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let product = Products::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(product_from_entity);
        Ok(product)
    }
}
