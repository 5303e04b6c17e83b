use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::order_status::OrderStatus;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct CartLine {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub qty: i32,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

/// A cart line joined with the current state of its product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct CartLineProduct {
    pub cart_id: Uuid,
    pub cart_notes: Option<String>,
    pub cart_qty: i32,
    pub cart_user_id: Uuid,
    pub cart_product_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub product_image: Option<String>,
    pub product_price: i64,
    pub product_stock: i32,
    #[serde(skip)]
    pub cart_created_at: DateTime<Utc>,
}

impl CartLineProduct {
    /// `None` when the line total does not fit in an `i64`.
    pub fn subtotal(&self) -> Option<i64> {
        self.product_price.checked_mul(i64::from(self.cart_qty))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub fullname: String,
    pub phone: String,
    pub address: String,
    pub proof_of_payment: String,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub no_receipt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub qty: i32,
    pub price: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An order item joined with the product's current display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct OrderItemProduct {
    pub order_items_id: Uuid,
    pub order_items_notes: Option<String>,
    pub order_items_qty: i32,
    pub order_items_price: i64,
    pub order_items_product_id: Uuid,
    pub order_items_created_at: DateTime<Utc>,
    pub product_name: String,
    pub product_slug: String,
    pub product_image: Option<String>,
}
