//! Database query functions for the `audit_logs` table.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::PgPool;

use crate::models::AuditLog;

/// Parameters for inserting a new audit log row.
#[derive(Debug, Clone)]
pub struct NewAuditLog<'a> {
    pub actor: &'a str,
    pub action: &'a str,
    pub entity: &'a str,
    pub entity_id: Option<i32>,
    pub detail: Value,
}

/// Insert a new audit log row. Returns the inserted row with
/// server-generated defaults (id, recorded_at).
pub async fn insert_audit_log(pool: &PgPool, new: &NewAuditLog<'_>) -> Result<AuditLog> {
    let log = sqlx::query_as::<_, AuditLog>(
        "INSERT INTO audit_logs (actor, action, entity, entity_id, detail) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(new.actor)
    .bind(new.action)
    .bind(new.entity)
    .bind(new.entity_id)
    .bind(&new.detail)
    .fetch_one(pool)
    .await
    .with_context(|| {
        format!(
            "failed to insert audit log: {} {} {}",
            new.actor, new.action, new.entity
        )
    })?;

    Ok(log)
}

/// List audit logs, newest first, optionally filtered by entity and/or
/// actor. Returns at most `limit` rows.
pub async fn list_audit_logs(
    pool: &PgPool,
    entity: Option<&str>,
    actor: Option<&str>,
    limit: i64,
) -> Result<Vec<AuditLog>> {
    let logs = sqlx::query_as::<_, AuditLog>(
        "SELECT * FROM audit_logs \
         WHERE ($1::text IS NULL OR entity = $1) \
           AND ($2::text IS NULL OR actor = $2) \
         ORDER BY recorded_at DESC, id DESC \
         LIMIT $3",
    )
    .bind(entity)
    .bind(actor)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list audit logs")?;

    Ok(logs)
}

/// List audit logs for one specific entity row, newest first.
pub async fn list_audit_logs_for_entity(
    pool: &PgPool,
    entity: &str,
    entity_id: i32,
) -> Result<Vec<AuditLog>> {
    let logs = sqlx::query_as::<_, AuditLog>(
        "SELECT * FROM audit_logs \
         WHERE entity = $1 AND entity_id = $2 \
         ORDER BY recorded_at DESC, id DESC",
    )
    .bind(entity)
    .bind(entity_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list audit logs for {entity} {entity_id}"))?;

    Ok(logs)
}
