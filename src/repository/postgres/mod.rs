//! Postgres-backed stores. Simple lookups go through SeaORM entities,
//! joins and `RETURNING` updates through sqlx. Statement text is fixed per
//! store; sqlx caches the prepared form per connection.

use chrono::Utc;

use crate::{
    entity::{
        cart_items::Model as CartModel, order_items::Model as OrderItemModel,
        orders::Model as OrderModel, products::Model as ProductModel,
    },
    error::{AppError, AppResult},
    models::{CartLine, Order, OrderItem, Product},
};

mod audit;
mod carts;
mod catalog;
mod orders;
mod users;

pub use audit::PgAuditLog;
pub use carts::PgCartRepository;
pub use catalog::PgCatalog;
pub use orders::PgOrderRepository;
pub use users::PgUserDirectory;

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        slug: model.slug,
        image: model.image,
        price: model.price,
        stock: model.stock,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn cart_line_from_entity(model: CartModel) -> CartLine {
    CartLine {
        id: model.id,
        user_id: model.user_id,
        product_id: model.product_id,
        qty: model.qty,
        notes: model.notes,
        version: model.version,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status = model.status.parse().map_err(|_| {
        AppError::Internal(anyhow::anyhow!(
            "order {} has unknown status {:?}",
            model.id,
            model.status
        ))
    })?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        fullname: model.fullname,
        phone: model.phone,
        address: model.address,
        proof_of_payment: model.proof_of_payment,
        total_amount: model.total_amount,
        status,
        no_receipt: model.no_receipt,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        qty: model.qty,
        price: model.price,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
