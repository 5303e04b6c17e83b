use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppResult,
    repository::{AuditEntry, AuditLog},
};

pub async fn log_audit(
    log: &dyn AuditLog,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    log.record(AuditEntry {
        user_id,
        action: action.to_string(),
        resource: resource.map(str::to_string),
        metadata,
    })
    .await
}

/// Same as [`log_audit`], but a failed write is only logged.
pub async fn audit_quietly(
    log: &dyn AuditLog,
    user_id: Uuid,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    if let Err(err) = log_audit(log, Some(user_id), action, Some(resource), Some(metadata)).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
