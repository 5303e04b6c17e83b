mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{SECRET, png_bytes};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use storefront_checkout::{
    middleware::auth::issue_token,
    models::{ROLE_ADMIN, ROLE_USER},
    repository::memory::MemoryStore,
    routes::build_router,
    state::AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "storefront-test-boundary";

fn app(store: &MemoryStore) -> Router {
    build_router(AppState::in_memory(store.clone(), SECRET), 8 * 1024 * 1024)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn bearer(user_id: Uuid) -> String {
    format!("Bearer {}", issue_token(SECRET, user_id, 3600).unwrap())
}

fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn checkout_form(token: &str) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in [
        ("fullname", "Jane Doe"),
        ("phone", "081234567890"),
        ("address", "Jl. Merdeka No. 1"),
    ] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"proof_of_payment\"; filename=\"proof.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&png_bytes());
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/orders")
        .header(header::AUTHORIZATION, token)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn health_and_fallback_need_no_token() {
    let store = MemoryStore::new();

    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(&store), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let request = Request::get("/nope").body(Body::empty()).unwrap();
    let (status, body) = send(app(&store), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/nope");
}

#[tokio::test]
async fn cart_routes_reject_missing_or_unknown_principals() {
    let store = MemoryStore::new();

    let request = Request::get("/api/carts").body(Body::empty()).unwrap();
    let (status, body) = send(app(&store), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing Authorization header");

    let request = Request::get("/api/carts")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(&store), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::get("/api/carts")
        .header(header::AUTHORIZATION, bearer(Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&store), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not found.");
}

#[tokio::test]
async fn checkout_over_http() {
    let store = MemoryStore::new();
    let user = bearer(store.add_user(ROLE_USER).await);
    let product = store.add_product("Limited Print", 15_000, 1).await;

    let (status, body) = send(
        app(&store),
        json_request(
            "POST",
            "/api/carts/put-product",
            &user,
            json!({ "operation": "create", "product_id": product.id, "qty": 1, "notes": "gift wrap" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["message"],
        "The product has been successfully added to the shopping cart."
    );
    let line_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        app(&store),
        json_request(
            "POST",
            "/api/carts/put-product",
            &user,
            json!({ "operation": "create", "product_id": product.id, "qty": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "This item has 1 stock left and you already have 1 in your basket."
    );

    let request = Request::get("/api/carts?stock=ready")
        .header(header::AUTHORIZATION, &user)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&store), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["cart_notes"], "gift wrap");

    let (status, body) = send(
        app(&store),
        json_request(
            "POST",
            "/api/carts/move-to-payment",
            &user,
            json!({ "list_id": [line_id] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["staged"], 1);

    let (status, body) = send(app(&store), checkout_form(&user)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Successfully save the order.");
    assert_eq!(body["data"]["status"], "ongoing");
    assert_eq!(body["data"]["total_amount"], 15_000);

    let (status, body) = send(app(&store), checkout_form(&user)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Ups, item in payment not found.");
}

#[tokio::test]
async fn validation_errors_name_the_field() {
    let store = MemoryStore::new();
    let user = bearer(store.add_user(ROLE_USER).await);

    let (status, body) = send(
        app(&store),
        json_request("DELETE", "/api/carts", &user, json!({ "list_id": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["field"], "list_id");

    let request = Request::get("/api/orders/mine?per_page=500")
        .header(header::AUTHORIZATION, &user)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&store), request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["field"], "per_page");
}

#[tokio::test]
async fn admin_routes_are_gated_by_role() {
    let store = MemoryStore::new();
    let user = bearer(store.add_user(ROLE_USER).await);
    let admin = bearer(store.add_user(ROLE_ADMIN).await);

    let request = Request::get("/api/orders")
        .header(header::AUTHORIZATION, &user)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&store), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Only users with admin privileges can do this action."
    );

    let request = Request::get("/api/orders?status=on%20the%20way")
        .header(header::AUTHORIZATION, &admin)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&store), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 0);

    let request = Request::put(format!("/api/orders/set-reject/{}", Uuid::new_v4()))
        .header(header::AUTHORIZATION, &admin)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&store), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Order not found.");
}
