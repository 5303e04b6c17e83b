//! In-process backend implementing every store capability.
//!
//! One mutex guards the whole dataset, so each call is atomic with respect
//! to the others. Used by the test suite.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{CartLine, CartLineProduct, Order, OrderItem, OrderItemProduct, Product},
    order_status::OrderStatus,
    repository::{
        AuditEntry, AuditLog, CartLineUpdate, CartRepository, CatalogLookup, CreatedOrder,
        ImageStore, NewCartLine, OrderDraft, OrderFilter, OrderRepository, StagingCache,
        StatusChange, StockFilter, UserDirectory, stock_exceeded_at_commit,
    },
    upload::UploadedImage,
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, String>,
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, CartLine>,
    orders: HashMap<Uuid, Order>,
    order_items: Vec<OrderItem>,
    staging: HashMap<Uuid, (Vec<Uuid>, Instant)>,
    audit: Vec<AuditEntry>,
    images: HashMap<String, usize>,
    // Monotonic clock so "newest first" ordering is stable within a test.
    tick: i64,
}

impl Inner {
    fn now(&mut self) -> DateTime<Utc> {
        self.tick += 1;
        DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::milliseconds(self.tick)
    }

    fn joined(&self, line: &CartLine) -> Option<CartLineProduct> {
        let product = self.products.get(&line.product_id)?;
        Some(CartLineProduct {
            cart_id: line.id,
            cart_notes: line.notes.clone(),
            cart_qty: line.qty,
            cart_user_id: line.user_id,
            cart_product_id: line.product_id,
            product_name: product.name.clone(),
            product_slug: product.slug.clone(),
            product_image: product.image.clone(),
            product_price: product.price,
            product_stock: product.stock,
            cart_created_at: line.created_at,
        })
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, role: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().await.users.insert(id, role.to_string());
        id
    }

    pub async fn add_product(&self, name: &str, price: i64, stock: i32) -> Product {
        let mut inner = self.inner.lock().await;
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            image: None,
            price,
            stock,
            created_at: inner.now(),
        };
        inner.products.insert(product.id, product.clone());
        product
    }

    pub async fn set_stock(&self, product_id: Uuid, stock: i32) {
        if let Some(product) = self.inner.lock().await.products.get_mut(&product_id) {
            product.stock = stock;
        }
    }

    pub async fn set_price(&self, product_id: Uuid, price: i64) {
        if let Some(product) = self.inner.lock().await.products.get_mut(&product_id) {
            product.price = price;
        }
    }

    pub async fn product(&self, product_id: Uuid) -> Option<Product> {
        self.inner.lock().await.products.get(&product_id).cloned()
    }

    pub async fn order_count(&self) -> usize {
        self.inner.lock().await.orders.len()
    }

    pub async fn order_item_count(&self) -> usize {
        self.inner.lock().await.order_items.len()
    }

    pub async fn audit_actions(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.audit.iter().map(|e| e.action.clone()).collect()
    }

    pub async fn stored_images(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.images.keys().cloned().collect()
    }
}

#[async_trait]
impl CatalogLookup for MemoryStore {
    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.inner.lock().await.products.get(&id).cloned())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn find_line(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Option<CartLine>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .carts
            .values()
            .find(|l| l.user_id == user_id && l.product_id == product_id)
            .cloned())
    }

    async fn insert_line(&self, line: NewCartLine) -> AppResult<CartLine> {
        let mut inner = self.inner.lock().await;
        let taken = inner
            .carts
            .values()
            .any(|l| l.user_id == line.user_id && l.product_id == line.product_id);
        if taken {
            return Err(AppError::Conflict(
                "This product was just added to your basket, please try again.".into(),
            ));
        }
        let created = CartLine {
            id: Uuid::new_v4(),
            user_id: line.user_id,
            product_id: line.product_id,
            qty: line.qty,
            notes: line.notes,
            version: 0,
            created_at: inner.now(),
        };
        inner.carts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_line(&self, update: CartLineUpdate) -> AppResult<Option<CartLine>> {
        let mut inner = self.inner.lock().await;
        let Some(line) = inner.carts.get_mut(&update.id) else {
            return Ok(None);
        };
        if line.user_id != update.user_id || line.version != update.expected_version {
            return Ok(None);
        }
        line.qty = update.qty;
        line.notes = update.notes;
        line.version += 1;
        Ok(Some(line.clone()))
    }

    async fn list_lines(
        &self,
        user_id: Uuid,
        filter: StockFilter,
        only: Option<&[Uuid]>,
    ) -> AppResult<Vec<CartLineProduct>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<CartLineProduct> = inner
            .carts
            .values()
            .filter(|l| l.user_id == user_id)
            .filter(|l| only.is_none_or(|ids| ids.contains(&l.id)))
            .filter_map(|l| inner.joined(l))
            .filter(|row| filter.matches(row.product_stock))
            .collect();
        rows.sort_by(|a, b| b.cart_created_at.cmp(&a.cart_created_at));
        Ok(rows)
    }

    async fn lines_by_ids(&self, user_id: Uuid, ids: &[Uuid]) -> AppResult<Vec<CartLine>> {
        let inner = self.inner.lock().await;
        let mut lines: Vec<CartLine> = inner
            .carts
            .values()
            .filter(|l| l.user_id == user_id && ids.contains(&l.id))
            .cloned()
            .collect();
        lines.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(lines)
    }

    async fn delete_lines(&self, user_id: Uuid, ids: &[Uuid]) -> AppResult<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.carts.len();
        inner
            .carts
            .retain(|id, l| !(l.user_id == user_id && ids.contains(id)));
        Ok((before - inner.carts.len()) as u64)
    }
}

#[async_trait]
impl StagingCache for MemoryStore {
    async fn put(&self, user_id: Uuid, ids: &[Uuid], ttl: Duration) -> AppResult<()> {
        let expires_at = Instant::now() + ttl;
        self.inner
            .lock()
            .await
            .staging
            .insert(user_id, (ids.to_vec(), expires_at));
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut inner = self.inner.lock().await;
        match inner.staging.get(&user_id) {
            Some((ids, expires_at)) if *expires_at > Instant::now() => Ok(ids.clone()),
            Some(_) => {
                inner.staging.remove(&user_id);
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }

    async fn clear(&self, user_id: Uuid) -> AppResult<()> {
        self.inner.lock().await.staging.remove(&user_id);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create_order(&self, draft: OrderDraft) -> AppResult<CreatedOrder> {
        let mut inner = self.inner.lock().await;

        for line in &draft.lines {
            let product = inner
                .products
                .get(&line.cart_product_id)
                .ok_or(AppError::ProductNotFound)?;
            if line.cart_qty > product.stock {
                return Err(stock_exceeded_at_commit(&product.name, product.stock));
            }
        }
        let all_present = draft.lines.iter().all(|line| {
            inner
                .carts
                .get(&line.cart_id)
                .is_some_and(|c| c.user_id == draft.user_id)
        });
        if !all_present {
            return Err(AppError::Conflict(
                "Your basket changed while placing the order, please review it.".into(),
            ));
        }

        let now = inner.now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            fullname: draft.fullname,
            phone: draft.phone,
            address: draft.address,
            proof_of_payment: draft.proof_of_payment,
            total_amount: draft.total_amount,
            status: OrderStatus::Ongoing,
            no_receipt: None,
            created_at: now,
            updated_at: now,
        };

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let item = OrderItem {
                id: Uuid::new_v4(),
                order_id: order.id,
                product_id: line.cart_product_id,
                qty: line.cart_qty,
                price: line.product_price,
                notes: line.cart_notes.clone(),
                created_at: inner.now(),
            };
            if let Some(product) = inner.products.get_mut(&line.cart_product_id) {
                product.stock -= line.cart_qty;
            }
            inner.carts.remove(&line.cart_id);
            inner.order_items.push(item.clone());
            items.push(item);
        }
        inner.orders.insert(order.id, order.clone());

        Ok(CreatedOrder { order, items })
    }

    async fn find_order(&self, id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.inner.lock().await.orders.get(&id).cloned())
    }

    async fn order_items(&self, order_id: Uuid) -> AppResult<Vec<OrderItemProduct>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<OrderItemProduct> = inner
            .order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .filter_map(|item| {
                let product = inner.products.get(&item.product_id)?;
                Some(OrderItemProduct {
                    order_items_id: item.id,
                    order_items_notes: item.notes.clone(),
                    order_items_qty: item.qty,
                    order_items_price: item.price,
                    order_items_product_id: item.product_id,
                    order_items_created_at: item.created_at,
                    product_name: product.name.clone(),
                    product_slug: product.slug.clone(),
                    product_image: product.image.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| b.order_items_created_at.cmp(&a.order_items_created_at));
        Ok(rows)
    }

    async fn list_orders(&self, filter: OrderFilter) -> AppResult<(Vec<Order>, i64)> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| filter.user_id.is_none_or(|id| o.user_id == id))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = orders.len() as i64;
        let page = orders
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn apply_transition(&self, change: StatusChange) -> AppResult<Option<Order>> {
        let mut inner = self.inner.lock().await;
        let now = inner.now();
        let Some(order) = inner.orders.get_mut(&change.order_id) else {
            return Ok(None);
        };
        if order.status != change.from {
            return Ok(None);
        }
        order.status = change.to;
        order.updated_at = now;
        if let Some(receipt) = change.no_receipt {
            order.no_receipt = Some(receipt);
        }
        let updated = order.clone();

        if change.release_stock {
            let returned: Vec<(Uuid, i32)> = inner
                .order_items
                .iter()
                .filter(|item| item.order_id == change.order_id)
                .map(|item| (item.product_id, item.qty))
                .collect();
            for (product_id, qty) in returned {
                if let Some(product) = inner.products.get_mut(&product_id) {
                    product.stock += qty;
                }
            }
        }

        Ok(Some(updated))
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_role(&self, user_id: Uuid) -> AppResult<Option<String>> {
        Ok(self.inner.lock().await.users.get(&user_id).cloned())
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn record(&self, entry: AuditEntry) -> AppResult<()> {
        self.inner.lock().await.audit.push(entry);
        Ok(())
    }
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn save(&self, folder: &str, image: &UploadedImage) -> AppResult<String> {
        let reference = format!("{}/{}.{}", folder, Uuid::new_v4(), image.kind.extension());
        self.inner
            .lock()
            .await
            .images
            .insert(reference.clone(), image.data.len());
        Ok(reference)
    }

    async fn remove(&self, reference: &str) -> AppResult<()> {
        self.inner.lock().await.images.remove(reference);
        Ok(())
    }
}
