use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderForm, CreateOrderMultipart, OrderList, OrderWithItems, ReceiptMultipart},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
    upload::UploadedImage,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/mine", get(list_my_orders))
        .route("/{id}", get(get_order))
        .route("/set-reject/{id}", put(set_reject))
        .route("/set-on-the-way/{id}", put(set_on_the_way))
        .route("/set-success/{id}", put(set_success))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Multipart error: {}", err))
}

async fn read_checkout_form(
    mut multipart: Multipart,
) -> AppResult<(CreateOrderForm, Option<UploadedImage>)> {
    let mut form = CreateOrderForm::default();
    let mut proof = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "fullname" => form.fullname = field.text().await.map_err(multipart_error)?,
            "phone" => form.phone = field.text().await.map_err(multipart_error)?,
            "address" => form.address = field.text().await.map_err(multipart_error)?,
            "proof_of_payment" => proof = Some(UploadedImage::from_field(field).await?),
            _ => {}
        }
    }
    Ok((form, proof))
}

async fn read_receipt(mut multipart: Multipart) -> AppResult<Option<UploadedImage>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("no_receipt") {
            return UploadedImage::from_field(field).await.map(Some);
        }
    }
    Ok(None)
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body(content = CreateOrderMultipart, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Order created from staged items", body = ApiResponse<Order>),
        (status = 400, description = "Not enough stock"),
        (status = 404, description = "Nothing staged for payment"),
        (status = 409, description = "Basket changed during checkout"),
        (status = 422, description = "Validation error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let (form, proof) = read_checkout_form(multipart).await?;
    let body = order_service::create_order(&state, &user, form, proof).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "All orders", body = ApiResponse<OrderList>),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let body = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(body))
}

#[utoipa::path(
    get,
    path = "/api/orders/mine",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders of the current user", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let body = order_service::list_my_orders(&state, &user, query).await?;
    Ok(Json(body))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let body = order_service::get_order(&state, &user, id).await?;
    Ok(Json(body))
}

#[utoipa::path(
    put,
    path = "/api/orders/set-reject/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order rejected", body = ApiResponse<Order>),
        (status = 400, description = "Order is not ongoing"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn set_reject(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let body = order_service::set_reject(&state, &user, id).await?;
    Ok(Json(body))
}

#[utoipa::path(
    put,
    path = "/api/orders/set-on-the-way/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body(content = ReceiptMultipart, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Order dispatched", body = ApiResponse<Order>),
        (status = 400, description = "Order is not ongoing"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Order not found"),
        (status = 422, description = "Receipt image missing or invalid"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn set_on_the_way(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Order>>> {
    let receipt = read_receipt(multipart).await?;
    let body = order_service::set_on_the_way(&state, &user, id, receipt).await?;
    Ok(Json(body))
}

#[utoipa::path(
    put,
    path = "/api/orders/set-success/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order received", body = ApiResponse<Order>),
        (status = 400, description = "Order is not on the way, or belongs to someone else"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn set_success(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let body = order_service::set_success(&state, &user, id).await?;
    Ok(Json(body))
}
