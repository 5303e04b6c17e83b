mod common;

use std::time::Duration;

use common::{form, image, list, put};
use storefront_checkout::{
    config::AppConfig,
    db::{create_pool, create_redis, run_migrations},
    error::AppError,
    middleware::auth::AuthUser,
    models::{Product, ROLE_ADMIN, ROLE_USER},
    order_status::OrderStatus,
    repository::StockFilter,
    services::{cart_service, order_service, staging_service},
    state::AppState,
};
use uuid::Uuid;

// Full checkout against Postgres and Redis. Skips unless both are configured.
#[tokio::test]
async fn checkout_and_reject_against_real_stores() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run it.");
            return Ok(());
        }
    };
    let Ok(redis_url) = std::env::var("REDIS_URL") else {
        eprintln!("Skipping test: set REDIS_URL to run it.");
        return Ok(());
    };

    let upload_dir = std::env::temp_dir().join(format!("storefront-pg-{}", Uuid::new_v4()));
    let config = AppConfig {
        database_url: database_url.clone(),
        redis_url: redis_url.clone(),
        jwt_secret: "test-secret".into(),
        host: "127.0.0.1".into(),
        port: 0,
        staging_ttl: Duration::from_secs(60),
        upload_dir: upload_dir.to_string_lossy().into_owned(),
        max_upload_bytes: 8 * 1024 * 1024,
    };

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    let redis = create_redis(&redis_url).await?;
    let state = AppState::postgres(pool.clone(), redis, &config);

    let user = AuthUser {
        user_id: insert_user(&pool, ROLE_USER).await?,
        role: ROLE_USER.into(),
    };
    let admin = AuthUser {
        user_id: insert_user(&pool, ROLE_ADMIN).await?,
        role: ROLE_ADMIN.into(),
    };
    let product = insert_product(&pool, 2_000, 3).await?;

    let (_, body) = cart_service::upsert_line(&state, &user, put("create", &product, 1)).await?;
    let line = body.data.expect("cart line");
    let (_, body) = cart_service::upsert_line(&state, &user, put("create", &product, 1)).await?;
    assert_eq!(body.data.expect("cart line").qty, 2);

    let err = cart_service::upsert_line(&state, &user, put("create", &product, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StockExceeded(_)));

    staging_service::move_to_payment(&state, &user, list(&[line.id])).await?;
    let staged = staging_service::item_in_payment(&state, &user).await?;
    assert_eq!(staged.data.expect("staged").items.len(), 1);

    let order = order_service::create_order(&state, &user, form(), Some(image("proof_of_payment")))
        .await?
        .data
        .expect("order");
    assert_eq!(order.total_amount, 4_000);
    assert_eq!(order.status, OrderStatus::Ongoing);
    assert_eq!(stock_of(&pool, product.id).await?, 1);

    let basket = cart_service::list_lines(&state, &user, StockFilter::None).await?;
    assert!(basket.data.expect("basket").items.is_empty());
    let err = order_service::create_order(&state, &user, form(), Some(image("proof_of_payment")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NothingStaged));

    let detail = order_service::get_order(&state, &user, order.id)
        .await?
        .data
        .expect("detail");
    assert_eq!(detail.items.len(), 1);

    order_service::set_reject(&state, &admin, order.id).await?;
    assert_eq!(stock_of(&pool, product.id).await?, 3);

    let _ = tokio::fs::remove_dir_all(&upload_dir).await;
    Ok(())
}

async fn insert_user(pool: &sqlx::PgPool, role: &str) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, role) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("{id}@example.com"))
        .bind(role)
        .execute(pool)
        .await?;
    Ok(id)
}

async fn insert_product(pool: &sqlx::PgPool, price: i64, stock: i32) -> anyhow::Result<Product> {
    let id = Uuid::new_v4();
    let name = format!("Test Widget {id}");
    let product = sqlx::query_as::<_, (Uuid, String, String, Option<String>, i64, i32, chrono::DateTime<chrono::Utc>)>(
        r#"
        INSERT INTO products (id, name, slug, price, stock)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, slug, image, price, stock, created_at
        "#,
    )
    .bind(id)
    .bind(&name)
    .bind(format!("test-widget-{id}"))
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await?;

    let (id, name, slug, image, price, stock, created_at) = product;
    Ok(Product {
        id,
        name,
        slug,
        image,
        price,
        stock,
        created_at,
    })
}

async fn stock_of(pool: &sqlx::PgPool, product_id: Uuid) -> anyhow::Result<i32> {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await?;
    Ok(stock)
}
