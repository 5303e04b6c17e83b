use axum::http::StatusCode;
use serde_json::json;

use crate::{
    audit::audit_quietly,
    dto::cart::{CartList, CartOperation, ListIdRequest, PutProductRequest, RemovedCount},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartLine,
    repository::{CartLineUpdate, NewCartLine, StockFilter},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const LINE_ADDED: &str = "The product has been successfully added to the shopping cart.";
pub const LINE_UPDATED: &str = "Shopping cart successfully updated.";
const STOCK_EXCEEDED: &str = "The amount you input exceeds the available stock.";

/// Adds a product to the basket or changes the quantity already there.
///
/// `create` on an existing line adds to its quantity, `update` replaces it.
/// Returns 201 when a line was created and 200 when one was updated.
pub async fn upsert_line(
    state: &AppState,
    user: &AuthUser,
    payload: PutProductRequest,
) -> AppResult<(StatusCode, ApiResponse<CartLine>)> {
    let operation = payload.validate()?;
    let notes = payload.normalized_notes();

    let product = state
        .catalog
        .get_product(payload.product_id)
        .await?
        .ok_or(AppError::ProductNotFound)?;

    let existing = state.carts.find_line(user.user_id, product.id).await?;

    let qty = match (&existing, operation) {
        (Some(line), CartOperation::Create) => line.qty.saturating_add(payload.qty),
        _ => payload.qty,
    };

    if qty > product.stock {
        let message = match &existing {
            Some(line) => format!(
                "This item has {} stock left and you already have {} in your basket.",
                product.stock, line.qty
            ),
            None => STOCK_EXCEEDED.to_string(),
        };
        return Err(AppError::StockExceeded(message));
    }

    let (status, message, line) = match existing {
        Some(line) => {
            let updated = state
                .carts
                .update_line(CartLineUpdate {
                    id: line.id,
                    user_id: user.user_id,
                    qty,
                    notes,
                    expected_version: line.version,
                })
                .await?
                .ok_or_else(|| {
                    AppError::Conflict(
                        "Your basket was changed by another request, please try again.".into(),
                    )
                })?;
            (StatusCode::OK, LINE_UPDATED, updated)
        }
        None => {
            let created = state
                .carts
                .insert_line(NewCartLine {
                    user_id: user.user_id,
                    product_id: product.id,
                    qty,
                    notes,
                })
                .await?;
            (StatusCode::CREATED, LINE_ADDED, created)
        }
    };

    audit_quietly(
        state.audit.as_ref(),
        user.user_id,
        "cart_update",
        "cart_items",
        json!({ "product_id": product.id, "qty": qty }),
    )
    .await;

    Ok((status, ApiResponse::success(message, line, Some(Meta::empty()))))
}

/// Lines in the caller's basket joined with their product, newest first.
pub async fn list_lines(
    state: &AppState,
    user: &AuthUser,
    filter: StockFilter,
) -> AppResult<ApiResponse<CartList>> {
    let items = state.carts.list_lines(user.user_id, filter, None).await?;
    Ok(ApiResponse::success(
        "OK",
        CartList { items },
        Some(Meta::empty()),
    ))
}

/// Removes the given lines from the caller's basket. Ids that do not exist
/// or belong to someone else are ignored.
pub async fn delete_lines(
    state: &AppState,
    user: &AuthUser,
    payload: ListIdRequest,
) -> AppResult<ApiResponse<RemovedCount>> {
    payload.validate()?;
    let removed = state
        .carts
        .delete_lines(user.user_id, &payload.list_id)
        .await?;
    tracing::debug!(user_id = %user.user_id, requested = payload.list_id.len(), removed, "cart lines removed");

    audit_quietly(
        state.audit.as_ref(),
        user.user_id,
        "cart_remove",
        "cart_items",
        json!({ "list_id": payload.list_id, "removed": removed }),
    )
    .await;

    let requested = payload.list_id.len();
    Ok(ApiResponse::success(
        format!("{} items were removed.", requested),
        RemovedCount { requested, removed },
        Some(Meta::empty()),
    ))
}
