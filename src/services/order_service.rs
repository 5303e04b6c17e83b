use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::audit_quietly,
    dto::orders::{CreateOrderForm, OrderList, OrderWithItems},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{CartLineProduct, Order},
    order_status::{Actor, Transition},
    repository::{OrderDraft, OrderFilter, StatusChange, stock_exceeded_at_commit},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::staging_service::staged_lines,
    state::AppState,
    upload::UploadedImage,
};

pub const ORDER_SAVED: &str = "Successfully save the order.";
pub const PROOF_FOLDER: &str = "proof_payments";
pub const RECEIPT_FOLDER: &str = "no_receipts";

/// Turns the caller's staged lines into an order.
///
/// Stock is checked here against the freshly joined products and again under
/// row locks inside the repository transaction. The proof image is written
/// before the transaction and removed again if the order is not committed.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    form: CreateOrderForm,
    proof: Option<UploadedImage>,
) -> AppResult<ApiResponse<Order>> {
    form.validate()?;
    let proof =
        proof.ok_or_else(|| AppError::validation("proof_of_payment", "Image is required."))?;

    let lines = staged_lines(state, user).await?;
    if lines.is_empty() {
        return Err(AppError::NothingStaged);
    }

    if let Some(line) = lines.iter().find(|l| l.cart_qty > l.product_stock) {
        return Err(stock_exceeded_at_commit(&line.product_name, line.product_stock));
    }
    let total_amount = order_total(&lines)?;

    let proof_ref = state.images.save(PROOF_FOLDER, &proof).await?;

    let draft = OrderDraft {
        user_id: user.user_id,
        fullname: form.fullname.trim().to_string(),
        phone: form.phone.trim().to_string(),
        address: form.address.trim().to_string(),
        proof_of_payment: proof_ref.clone(),
        total_amount,
        lines,
    };

    let created = match state.orders.create_order(draft).await {
        Ok(created) => created,
        Err(err) => {
            discard_image(state, &proof_ref).await;
            return Err(err);
        }
    };

    if let Err(err) = state.staging.clear(user.user_id).await {
        tracing::warn!(error = %err, user_id = %user.user_id, "failed to clear staged items");
    }

    tracing::info!(
        order_id = %created.order.id,
        user_id = %user.user_id,
        items = created.items.len(),
        total_amount,
        "order created"
    );

    audit_quietly(
        state.audit.as_ref(),
        user.user_id,
        "order_create",
        "orders",
        json!({ "order_id": created.order.id, "total_amount": total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        ORDER_SAVED,
        created.order,
        Some(Meta::empty()),
    ))
}

fn order_total(lines: &[CartLineProduct]) -> AppResult<i64> {
    lines.iter().try_fold(0i64, |total, line| {
        line.subtotal()
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or_else(|| AppError::BadRequest("Order total is too large.".into()))
    })
}

/// All orders, newest first. Admin only.
pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    paginated(state, None, query).await
}

/// The caller's own orders, newest first.
pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    paginated(state, Some(user.user_id), query).await
}

async fn paginated(
    state: &AppState,
    user_id: Option<Uuid>,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, per_page, offset) = query.pagination().normalize()?;
    let status = query.status()?;

    let (orders, total) = state
        .orders
        .list_orders(OrderFilter {
            user_id,
            status,
            limit: per_page,
            offset,
        })
        .await?;

    let mut items = Vec::with_capacity(orders.len());
    for order in orders {
        items.push(with_items(state, order).await?);
    }

    Ok(ApiResponse::success(
        "OK",
        OrderList { items },
        Some(Meta::new(page, per_page, total)),
    ))
}

/// Visible to the owner and to admins. Anyone else gets `OrderNotFound`.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = state
        .orders
        .find_order(order_id)
        .await?
        .filter(|order| order.user_id == user.user_id || user.is_admin())
        .ok_or(AppError::OrderNotFound)?;

    let data = with_items(state, order).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

async fn with_items(state: &AppState, order: Order) -> AppResult<OrderWithItems> {
    let items = state.orders.order_items(order.id).await?;
    Ok(OrderWithItems { order, items })
}

pub async fn set_reject(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    apply(state, user, order_id, Transition::Reject, None).await
}

pub async fn set_on_the_way(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    receipt: Option<UploadedImage>,
) -> AppResult<ApiResponse<Order>> {
    let receipt =
        receipt.ok_or_else(|| AppError::validation("no_receipt", "Image is required."))?;
    apply(state, user, order_id, Transition::Dispatch, Some(receipt)).await
}

pub async fn set_success(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    apply(state, user, order_id, Transition::ConfirmReceipt, None).await
}

/// Runs one lifecycle step: existence, then authorization, then the status
/// guard, then a compare-and-set write.
async fn apply(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    transition: Transition,
    image: Option<UploadedImage>,
) -> AppResult<ApiResponse<Order>> {
    let order = state
        .orders
        .find_order(order_id)
        .await?
        .ok_or(AppError::OrderNotFound)?;

    match transition.actor() {
        Actor::Admin => ensure_admin(user)?,
        Actor::Owner => {
            if order.user_id != user.user_id {
                return Err(AppError::NotOwner);
            }
        }
    }

    transition.check_from(order.status)?;

    let no_receipt = match &image {
        Some(image) => Some(state.images.save(RECEIPT_FOLDER, image).await?),
        None => None,
    };

    let change = StatusChange {
        order_id,
        from: transition.from_status(),
        to: transition.to_status(),
        no_receipt: no_receipt.clone(),
        release_stock: transition.releases_stock(),
    };

    let updated = match state.orders.apply_transition(change).await {
        Ok(Some(order)) => Ok(order),
        Ok(None) => Err(AppError::InvalidTransition(transition.guard_message())),
        Err(err) => Err(err),
    };
    let updated = match updated {
        Ok(order) => order,
        Err(err) => {
            if let Some(reference) = &no_receipt {
                discard_image(state, reference).await;
            }
            return Err(err);
        }
    };

    tracing::info!(
        %order_id,
        user_id = %user.user_id,
        from = %transition.from_status(),
        to = %transition.to_status(),
        "order status changed"
    );

    audit_quietly(
        state.audit.as_ref(),
        user.user_id,
        transition.audit_action(),
        "orders",
        json!({ "order_id": order_id, "status": transition.to_status().as_str() }),
    )
    .await;

    Ok(ApiResponse::success(
        transition.success_message(),
        updated,
        Some(Meta::empty()),
    ))
}

async fn discard_image(state: &AppState, reference: &str) {
    if let Err(err) = state.images.remove(reference).await {
        tracing::warn!(error = %err, reference, "failed to remove orphaned image");
    }
}
