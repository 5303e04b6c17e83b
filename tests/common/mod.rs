#![allow(dead_code)]

use axum::body::Bytes;
use storefront_checkout::{
    dto::{
        cart::{ListIdRequest, PutProductRequest},
        orders::CreateOrderForm,
    },
    middleware::auth::AuthUser,
    models::{Product, ROLE_ADMIN, ROLE_USER},
    repository::memory::MemoryStore,
    state::AppState,
    upload::UploadedImage,
};
use uuid::Uuid;

pub const SECRET: &str = "test-secret";

pub struct Harness {
    pub store: MemoryStore,
    pub state: AppState,
    pub user: AuthUser,
    pub other: AuthUser,
    pub admin: AuthUser,
}

pub async fn harness() -> Harness {
    let store = MemoryStore::new();
    let state = AppState::in_memory(store.clone(), SECRET);
    let user = AuthUser {
        user_id: store.add_user(ROLE_USER).await,
        role: ROLE_USER.into(),
    };
    let other = AuthUser {
        user_id: store.add_user(ROLE_USER).await,
        role: ROLE_USER.into(),
    };
    let admin = AuthUser {
        user_id: store.add_user(ROLE_ADMIN).await,
        role: ROLE_ADMIN.into(),
    };
    Harness {
        store,
        state,
        user,
        other,
        admin,
    }
}

pub fn put(operation: &str, product: &Product, qty: i32) -> PutProductRequest {
    PutProductRequest {
        operation: operation.into(),
        product_id: product.id,
        notes: None,
        qty,
    }
}

pub fn list(ids: &[Uuid]) -> ListIdRequest {
    ListIdRequest {
        list_id: ids.to_vec(),
    }
}

pub fn form() -> CreateOrderForm {
    CreateOrderForm {
        fullname: "Jane Doe".into(),
        phone: "081234567890".into(),
        address: "Jl. Merdeka No. 1".into(),
    }
}

pub fn png_bytes() -> Bytes {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([20, 120, 220]));
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .expect("encode png");
    Bytes::from(buffer)
}

pub fn image(field: &str) -> UploadedImage {
    UploadedImage::validate(field, Some("image.png"), png_bytes()).expect("valid png")
}
