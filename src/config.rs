use std::{env, time::Duration};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub staging_ttl: Duration,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let staging_ttl = Duration::from_secs(parse_or("STAGING_TTL_SECS", 86_400));
        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "static".to_string());
        let max_upload_bytes = parse_or("MAX_UPLOAD_BYTES", 8 * 1024 * 1024);
        Ok(Self {
            database_url,
            redis_url,
            jwt_secret,
            host,
            port,
            staging_ttl,
            upload_dir,
            max_upload_bytes,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "invalid config value, using default");
            default
        }),
        Err(_) => default,
    }
}
