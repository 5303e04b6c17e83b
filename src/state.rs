use std::{sync::Arc, time::Duration};

use redis::aio::ConnectionManager;

use crate::{
    config::AppConfig,
    db::{DbPool, orm_from_pool},
    repository::{
        AuditLog, CartRepository, CatalogLookup, ImageStore, OrderRepository, StagingCache,
        UserDirectory,
        memory::MemoryStore,
        postgres::{PgAuditLog, PgCartRepository, PgCatalog, PgOrderRepository, PgUserDirectory},
        redis_staging::RedisStagingCache,
    },
    upload::LocalImageStore,
};

pub const DEFAULT_STAGING_TTL: Duration = Duration::from_secs(86_400);

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogLookup>,
    pub carts: Arc<dyn CartRepository>,
    pub staging: Arc<dyn StagingCache>,
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub audit: Arc<dyn AuditLog>,
    pub images: Arc<dyn ImageStore>,
    pub jwt_secret: Arc<str>,
    pub staging_ttl: Duration,
}

impl AppState {
    /// Production wiring: Postgres for relational data, Redis for staging,
    /// the local filesystem for uploaded images.
    pub fn postgres(pool: DbPool, redis: ConnectionManager, config: &AppConfig) -> Self {
        let orm = orm_from_pool(&pool);
        Self {
            catalog: Arc::new(PgCatalog::new(orm.clone())),
            carts: Arc::new(PgCartRepository::new(pool.clone(), orm.clone())),
            staging: Arc::new(RedisStagingCache::new(redis)),
            orders: Arc::new(PgOrderRepository::new(pool.clone(), orm.clone())),
            users: Arc::new(PgUserDirectory::new(orm)),
            audit: Arc::new(PgAuditLog::new(pool)),
            images: Arc::new(LocalImageStore::new(&config.upload_dir)),
            jwt_secret: Arc::from(config.jwt_secret.as_str()),
            staging_ttl: config.staging_ttl,
        }
    }

    /// Every capability backed by the same in-process store.
    pub fn in_memory(store: MemoryStore, jwt_secret: &str) -> Self {
        Self {
            catalog: Arc::new(store.clone()),
            carts: Arc::new(store.clone()),
            staging: Arc::new(store.clone()),
            orders: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            audit: Arc::new(store.clone()),
            images: Arc::new(store),
            jwt_secret: Arc::from(jwt_secret),
            staging_ttl: DEFAULT_STAGING_TTL,
        }
    }

    pub fn with_staging_ttl(mut self, ttl: Duration) -> Self {
        self.staging_ttl = ttl;
        self
    }
}
