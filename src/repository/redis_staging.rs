//! Staging cache on Redis.
//!
//! Layout: `checkout:{user_id}` holds the staged cart line ids joined by
//! commas, written with `SETEX` so the entry expires on its own.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use uuid::Uuid;

use crate::{error::AppResult, repository::StagingCache};

pub fn staging_key(user_id: Uuid) -> String {
    format!("checkout:{}", user_id)
}

pub fn encode_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Unparseable fragments are skipped; an empty value is an empty set.
pub fn decode_ids(raw: &str) -> Vec<Uuid> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match Uuid::parse_str(part) {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(value = part, "skipping malformed staged id");
                None
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct RedisStagingCache {
    conn: ConnectionManager,
}

impl RedisStagingCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl StagingCache for RedisStagingCache {
    async fn put(&self, user_id: Uuid, ids: &[Uuid], ttl: Duration) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(staging_key(user_id), encode_ids(ids), seconds)
            .await?;
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(staging_key(user_id)).await?;
        Ok(raw.as_deref().map(decode_ids).unwrap_or_default())
    }

    async fn clear(&self, user_id: Uuid) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(staging_key(user_id)).await?;
        Ok(())
    }
}
