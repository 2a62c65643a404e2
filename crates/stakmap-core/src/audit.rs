//! Audit recording: one structured record per mutating operation,
//! mirrored to the log stream.

use anyhow::Result;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use stakmap_db::models::AuditLog;
use stakmap_db::queries::audit_logs::{self, NewAuditLog};

/// Record a single audit entry: who (`actor`) did what (`action`) to which
/// row (`entity`, `entity_id`). `detail` carries any action-specific
/// payload.
pub async fn record(
    pool: &PgPool,
    actor: &str,
    action: &str,
    entity: &str,
    entity_id: Option<i32>,
    detail: Value,
) -> Result<AuditLog> {
    let log = audit_logs::insert_audit_log(
        pool,
        &NewAuditLog {
            actor,
            action,
            entity,
            entity_id,
            detail,
        },
    )
    .await?;

    info!(actor, action, entity, entity_id = ?entity_id, "audit");

    Ok(log)
}
