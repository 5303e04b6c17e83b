use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppResult,
    repository::{AuditEntry, AuditLog},
};

const INSERT_AUDIT: &str = r#"
    INSERT INTO audit_logs (id, user_id, action, resource, metadata)
    VALUES ($1, $2, $3, $4, $5)
"#;

#[derive(Clone)]
pub struct PgAuditLog {
    pool: DbPool,
}

impl PgAuditLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn record(&self, entry: AuditEntry) -> AppResult<()> {
        sqlx::query(INSERT_AUDIT)
            .bind(Uuid::new_v4())
            .bind(entry.user_id)
            .bind(entry.action)
            .bind(entry.resource)
            .bind(entry.metadata)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
