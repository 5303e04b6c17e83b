//! Store capabilities the checkout services depend on.
//!
//! Each trait is a seam injected into [`AppState`](crate::state::AppState).
//! `postgres` and `redis_staging` back a running server; `memory` backs the
//! test suite and local experiments.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{CartLine, CartLineProduct, Order, OrderItem, OrderItemProduct, Product},
    order_status::OrderStatus,
    upload::UploadedImage,
};

pub mod memory;
pub mod postgres;
pub mod redis_staging;

/// Filter on the joined product's stock when listing cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockFilter {
    #[default]
    None,
    Ready,
    Empty,
}

impl StockFilter {
    pub fn as_sql(&self) -> Option<&'static str> {
        match self {
            StockFilter::None => None,
            StockFilter::Ready => Some("ready"),
            StockFilter::Empty => Some("empty"),
        }
    }

    pub fn matches(&self, stock: i32) -> bool {
        match self {
            StockFilter::None => true,
            StockFilter::Ready => stock > 0,
            StockFilter::Empty => stock < 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCartLine {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub qty: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CartLineUpdate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub qty: i32,
    pub notes: Option<String>,
    pub expected_version: i32,
}

/// Everything needed to persist an order in one unit of work.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: Uuid,
    pub fullname: String,
    pub phone: String,
    pub address: String,
    pub proof_of_payment: String,
    pub total_amount: i64,
    pub lines: Vec<CartLineProduct>,
}

#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub order_id: Uuid,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub no_receipt: Option<String>,
    pub release_stock: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<Value>,
}

#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find_line(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Option<CartLine>>;

    /// Fails with `Conflict` when a line for the same product appeared concurrently.
    async fn insert_line(&self, line: NewCartLine) -> AppResult<CartLine>;

    /// Returns `None` when the stored version no longer matches.
    async fn update_line(&self, update: CartLineUpdate) -> AppResult<Option<CartLine>>;

    /// Lines joined with their product, newest first. `only` narrows to the given ids.
    async fn list_lines(
        &self,
        user_id: Uuid,
        filter: StockFilter,
        only: Option<&[Uuid]>,
    ) -> AppResult<Vec<CartLineProduct>>;

    async fn lines_by_ids(&self, user_id: Uuid, ids: &[Uuid]) -> AppResult<Vec<CartLine>>;

    /// Returns the number of rows actually removed.
    async fn delete_lines(&self, user_id: Uuid, ids: &[Uuid]) -> AppResult<u64>;
}

#[async_trait]
pub trait StagingCache: Send + Sync {
    /// Replaces whatever was staged for the user.
    async fn put(&self, user_id: Uuid, ids: &[Uuid], ttl: Duration) -> AppResult<()>;

    /// Missing or expired entries read as an empty set.
    async fn get(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;

    async fn clear(&self, user_id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Locks the products, re-checks stock, writes header and items,
    /// reserves stock and removes the consumed cart lines atomically.
    async fn create_order(&self, draft: OrderDraft) -> AppResult<CreatedOrder>;

    async fn find_order(&self, id: Uuid) -> AppResult<Option<Order>>;

    async fn order_items(&self, order_id: Uuid) -> AppResult<Vec<OrderItemProduct>>;

    async fn list_orders(&self, filter: OrderFilter) -> AppResult<(Vec<Order>, i64)>;

    /// Compare-and-set on the current status. `None` when the order left `from`.
    async fn apply_transition(&self, change: StatusChange) -> AppResult<Option<Order>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_role(&self, user_id: Uuid) -> AppResult<Option<String>>;
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> AppResult<()>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists the image under `folder` and returns its public reference.
    async fn save(&self, folder: &str, image: &UploadedImage) -> AppResult<String>;

    async fn remove(&self, reference: &str) -> AppResult<()>;
}

/// Renders the stock error shown when a line asks for more than the catalog has.
pub fn stock_exceeded_at_commit(name: &str, stock: i32) -> crate::error::AppError {
    crate::error::AppError::StockExceeded(format!(
        "Available stock: {}, please reduce quantity product '{}'",
        stock, name
    ))
}
