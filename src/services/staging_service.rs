//! Bridge between the basket and checkout: the caller picks which cart lines
//! to pay for, and the choice is parked in the staging cache until an order
//! consumes it or the entry expires.

use serde_json::json;

use crate::{
    audit::audit_quietly,
    dto::cart::{CartList, ListIdRequest, StagedCount},
    error::AppResult,
    middleware::auth::AuthUser,
    models::CartLineProduct,
    repository::StockFilter,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Stages the caller's lines among `list_id`, replacing any earlier selection.
pub async fn move_to_payment(
    state: &AppState,
    user: &AuthUser,
    payload: ListIdRequest,
) -> AppResult<ApiResponse<StagedCount>> {
    payload.validate()?;

    let owned: Vec<_> = state
        .carts
        .lines_by_ids(user.user_id, &payload.list_id)
        .await?
        .into_iter()
        .map(|line| line.id)
        .collect();

    state
        .staging
        .put(user.user_id, &owned, state.staging_ttl)
        .await?;

    audit_quietly(
        state.audit.as_ref(),
        user.user_id,
        "cart_move_to_payment",
        "cart_items",
        json!({ "list_id": owned }),
    )
    .await;

    let requested = payload.list_id.len();
    Ok(ApiResponse::success(
        format!("{} items successfully moved to the payment.", requested),
        StagedCount {
            requested,
            staged: owned.len(),
        },
        Some(Meta::empty()),
    ))
}

/// Staged lines whose product is still in stock. The stock value is read
/// after the staged ids, so callers can re-check quantities against it.
pub async fn staged_lines(state: &AppState, user: &AuthUser) -> AppResult<Vec<CartLineProduct>> {
    let ids = state.staging.get(user.user_id).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    state
        .carts
        .list_lines(user.user_id, StockFilter::Ready, Some(&ids))
        .await
}

pub async fn item_in_payment(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    let items = staged_lines(state, user).await?;
    Ok(ApiResponse::success(
        "OK",
        CartList { items },
        Some(Meta::empty()),
    ))
}
