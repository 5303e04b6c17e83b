use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Expr,
    sea_query::LockType,
};
use uuid::Uuid;

use super::{order_from_entity, order_item_from_entity};
use crate::{
    db::{DbPool, OrmConn},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    models::{Order, OrderItemProduct},
    order_status::OrderStatus,
    repository::{
        CreatedOrder, OrderDraft, OrderFilter, OrderRepository, StatusChange,
        stock_exceeded_at_commit,
    },
};

const ORDER_ITEMS: &str = r#"
    SELECT oi.id AS order_items_id,
           oi.notes AS order_items_notes,
           oi.qty AS order_items_qty,
           oi.price AS order_items_price,
           oi.product_id AS order_items_product_id,
           oi.created_at AS order_items_created_at,
           p.name AS product_name,
           p.slug AS product_slug,
           p.image AS product_image
    FROM order_items oi
    JOIN products p ON p.id = oi.product_id
    WHERE oi.order_id = $1
    ORDER BY oi.created_at DESC, oi.id DESC
"#;

#[derive(Clone)]
pub struct PgOrderRepository {
    pool: DbPool,
    orm: OrmConn,
}

impl PgOrderRepository {
    pub fn new(pool: DbPool, orm: OrmConn) -> Self {
        Self { pool, orm }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create_order(&self, draft: OrderDraft) -> AppResult<CreatedOrder> {
        let txn = self.orm.begin().await?;

        // Lock in id order so concurrent checkouts cannot deadlock each other.
        let product_ids: Vec<Uuid> = draft.lines.iter().map(|l| l.cart_product_id).collect();
        let locked: HashMap<Uuid, (String, i32)> = Products::find()
            .filter(ProdCol::Id.is_in(product_ids))
            .order_by_asc(ProdCol::Id)
            .lock(LockType::Update)
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| (p.id, (p.name, p.stock)))
            .collect();

        for line in &draft.lines {
            let (name, stock) = locked
                .get(&line.cart_product_id)
                .ok_or(AppError::ProductNotFound)?;
            if line.cart_qty > *stock {
                return Err(stock_exceeded_at_commit(name, *stock));
            }
        }

        let order = OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(draft.user_id),
            fullname: Set(draft.fullname),
            phone: Set(draft.phone),
            address: Set(draft.address),
            proof_of_payment: Set(draft.proof_of_payment),
            total_amount: Set(draft.total_amount),
            status: Set(OrderStatus::Ongoing.as_str().to_string()),
            no_receipt: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let item = OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(line.cart_product_id),
                qty: Set(line.cart_qty),
                price: Set(line.product_price),
                notes: Set(line.cart_notes.clone()),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
            items.push(order_item_from_entity(item));

            Products::update_many()
                .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.cart_qty))
                .filter(ProdCol::Id.eq(line.cart_product_id))
                .exec(&txn)
                .await?;
        }

        let consumed: Vec<Uuid> = draft.lines.iter().map(|l| l.cart_id).collect();
        let removed = CartItems::delete_many()
            .filter(CartCol::UserId.eq(draft.user_id))
            .filter(CartCol::Id.is_in(consumed.clone()))
            .exec(&txn)
            .await?;
        if removed.rows_affected != consumed.len() as u64 {
            return Err(AppError::Conflict(
                "Your basket changed while placing the order, please review it.".into(),
            ));
        }

        txn.commit().await?;

        Ok(CreatedOrder {
            order: order_from_entity(order)?,
            items,
        })
    }

    async fn find_order(&self, id: Uuid) -> AppResult<Option<Order>> {
        Orders::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn order_items(&self, order_id: Uuid) -> AppResult<Vec<OrderItemProduct>> {
        let rows = sqlx::query_as::<_, OrderItemProduct>(ORDER_ITEMS)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_orders(&self, filter: OrderFilter) -> AppResult<(Vec<Order>, i64)> {
        let mut condition = Condition::all();
        if let Some(user_id) = filter.user_id {
            condition = condition.add(OrderCol::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }

        let finder = Orders::find()
            .filter(condition)
            .order_by_desc(OrderCol::CreatedAt)
            .order_by_desc(OrderCol::Id);

        let total = finder.clone().count(&self.orm).await? as i64;

        let orders = finder
            .limit(filter.limit as u64)
            .offset(filter.offset as u64)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((orders, total))
    }

    async fn apply_transition(&self, change: StatusChange) -> AppResult<Option<Order>> {
        let txn = self.orm.begin().await?;

        let mut update = Orders::update_many()
            .col_expr(OrderCol::Status, Expr::value(change.to.as_str()))
            .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(OrderCol::Id.eq(change.order_id))
            .filter(OrderCol::Status.eq(change.from.as_str()));
        if let Some(receipt) = change.no_receipt {
            update = update.col_expr(OrderCol::NoReceipt, Expr::value(receipt));
        }
        let result = update.exec(&txn).await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }

        if change.release_stock {
            let items = OrderItems::find()
                .filter(OrderItemCol::OrderId.eq(change.order_id))
                .all(&txn)
                .await?;
            for item in items {
                Products::update_many()
                    .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.qty))
                    .filter(ProdCol::Id.eq(item.product_id))
                    .exec(&txn)
                    .await?;
            }
        }

        let order = Orders::find_by_id(change.order_id).one(&txn).await?;
        txn.commit().await?;

        order.map(order_from_entity).transpose()
    }
}
