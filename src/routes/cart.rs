use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::cart::{CartList, CartListQuery, ListIdRequest, PutProductRequest, RemovedCount, StagedCount},
    error::AppResult,
    middleware::auth::AuthUser,
    models::CartLine,
    response::ApiResponse,
    services::{cart_service, staging_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_lines).delete(delete_lines))
        .route("/put-product", post(put_product))
        .route("/move-to-payment", post(move_to_payment))
        .route("/item-in-payment", get(item_in_payment))
}

#[utoipa::path(
    post,
    path = "/api/carts/put-product",
    request_body = PutProductRequest,
    responses(
        (status = 201, description = "Line created", body = ApiResponse<CartLine>),
        (status = 200, description = "Line updated", body = ApiResponse<CartLine>),
        (status = 400, description = "Not enough stock"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Concurrent basket change"),
        (status = 422, description = "Validation error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn put_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PutProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CartLine>>)> {
    let (status, body) = cart_service::upsert_line(&state, &user, payload).await?;
    Ok((status, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/carts",
    params(
        ("stock" = Option<String>, Query, description = "`ready` or `empty`")
    ),
    responses(
        (status = 200, description = "Basket of the current user", body = ApiResponse<CartList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn list_lines(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CartListQuery>,
) -> AppResult<Json<ApiResponse<CartList>>> {
    let body = cart_service::list_lines(&state, &user, query.stock).await?;
    Ok(Json(body))
}

#[utoipa::path(
    delete,
    path = "/api/carts",
    request_body = ListIdRequest,
    responses(
        (status = 200, description = "Lines removed", body = ApiResponse<RemovedCount>),
        (status = 422, description = "Validation error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn delete_lines(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ListIdRequest>,
) -> AppResult<Json<ApiResponse<RemovedCount>>> {
    let body = cart_service::delete_lines(&state, &user, payload).await?;
    Ok(Json(body))
}

#[utoipa::path(
    post,
    path = "/api/carts/move-to-payment",
    request_body = ListIdRequest,
    responses(
        (status = 200, description = "Lines staged for payment", body = ApiResponse<StagedCount>),
        (status = 422, description = "Validation error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn move_to_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ListIdRequest>,
) -> AppResult<Json<ApiResponse<StagedCount>>> {
    let body = staging_service::move_to_payment(&state, &user, payload).await?;
    Ok(Json(body))
}

#[utoipa::path(
    get,
    path = "/api/carts/item-in-payment",
    responses(
        (status = 200, description = "Staged lines still in stock", body = ApiResponse<CartList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn item_in_payment(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartList>>> {
    let body = staging_service::item_in_payment(&state, &user).await?;
    Ok(Json(body))
}
