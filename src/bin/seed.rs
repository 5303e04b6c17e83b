use storefront_checkout::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    middleware::auth::issue_token,
    models::{ROLE_ADMIN, ROLE_USER},
};
use uuid::Uuid;

const TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", ROLE_ADMIN).await?;
    let user_id = ensure_user(&pool, "user@example.com", ROLE_USER).await?;
    seed_products(&pool).await?;

    // Token issuance lives outside this service; these are for local testing.
    for (label, id) in [("admin", admin_id), ("user", user_id)] {
        let token = issue_token(&config.jwt_secret, id, TOKEN_TTL_SECS)?;
        println!("{label} ({id}) token: {token}");
    }
    Ok(())
}

async fn ensure_user(pool: &sqlx::PgPool, email: &str, role: &str) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = [
        ("Axum Hoodie", 550_000_i64, 50),
        ("Ferris Mug", 120_000, 100),
        ("Rust Sticker Pack", 50_000, 200),
        ("Limited Print", 900_000, 1),
        ("Sold Out Cap", 150_000, 0),
    ];

    for (name, price, stock) in products {
        let slug = name.to_lowercase().replace(' ', "-");
        sqlx::query(
            r#"
            INSERT INTO products (id, name, slug, price, stock)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slug)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
