use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use uuid::Uuid;

use super::cart_line_from_entity;
use crate::{
    db::{DbPool, OrmConn},
    entity::cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
    error::{AppError, AppResult},
    models::{CartLine, CartLineProduct},
    repository::{CartLineUpdate, CartRepository, NewCartLine, StockFilter},
};

const LIST_LINES: &str = r#"
    SELECT ci.id AS cart_id,
           ci.notes AS cart_notes,
           ci.qty AS cart_qty,
           ci.user_id AS cart_user_id,
           ci.product_id AS cart_product_id,
           p.name AS product_name,
           p.slug AS product_slug,
           p.image AS product_image,
           p.price AS product_price,
           p.stock AS product_stock,
           ci.created_at AS cart_created_at
    FROM cart_items ci
    JOIN products p ON p.id = ci.product_id
    WHERE ci.user_id = $1
      AND ($2::text IS NULL
           OR ($2 = 'ready' AND p.stock > 0)
           OR ($2 = 'empty' AND p.stock < 1))
      AND ($3::uuid[] IS NULL OR ci.id = ANY($3))
    ORDER BY ci.created_at DESC, ci.id DESC
"#;

const UPDATE_LINE: &str = r#"
    UPDATE cart_items
    SET qty = $3, notes = $4, version = version + 1
    WHERE id = $1 AND user_id = $2 AND version = $5
    RETURNING id, user_id, product_id, qty, notes, version, created_at
"#;

#[derive(Clone)]
pub struct PgCartRepository {
    pool: DbPool,
    orm: OrmConn,
}

impl PgCartRepository {
    pub fn new(pool: DbPool, orm: OrmConn) -> Self {
        Self { pool, orm }
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn find_line(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Option<CartLine>> {
        let line = CartItems::find()
            .filter(CartCol::UserId.eq(user_id))
            .filter(CartCol::ProductId.eq(product_id))
            .one(&self.orm)
            .await?
            .map(cart_line_from_entity);
        Ok(line)
    }

    async fn insert_line(&self, line: NewCartLine) -> AppResult<CartLine> {
        let active = CartActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(line.user_id),
            product_id: Set(line.product_id),
            qty: Set(line.qty),
            notes: Set(line.notes),
            version: Set(0),
            created_at: NotSet,
        };
        let model = active.insert(&self.orm).await.map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(
                "This product was just added to your basket, please try again.".into(),
            ),
            _ => AppError::OrmError(err),
        })?;
        Ok(cart_line_from_entity(model))
    }

    async fn update_line(&self, update: CartLineUpdate) -> AppResult<Option<CartLine>> {
        let line = sqlx::query_as::<_, CartLine>(UPDATE_LINE)
            .bind(update.id)
            .bind(update.user_id)
            .bind(update.qty)
            .bind(update.notes)
            .bind(update.expected_version)
            .fetch_optional(&self.pool)
            .await?;
        Ok(line)
    }

    async fn list_lines(
        &self,
        user_id: Uuid,
        filter: StockFilter,
        only: Option<&[Uuid]>,
    ) -> AppResult<Vec<CartLineProduct>> {
        let rows = sqlx::query_as::<_, CartLineProduct>(LIST_LINES)
            .bind(user_id)
            .bind(filter.as_sql())
            .bind(only.map(|ids| ids.to_vec()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn lines_by_ids(&self, user_id: Uuid, ids: &[Uuid]) -> AppResult<Vec<CartLine>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let lines = CartItems::find()
            .filter(CartCol::UserId.eq(user_id))
            .filter(CartCol::Id.is_in(ids.to_vec()))
            .order_by_desc(CartCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(cart_line_from_entity)
            .collect();
        Ok(lines)
    }

    async fn delete_lines(&self, user_id: Uuid, ids: &[Uuid]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = CartItems::delete_many()
            .filter(CartCol::UserId.eq(user_id))
            .filter(CartCol::Id.is_in(ids.to_vec()))
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected)
    }
}
