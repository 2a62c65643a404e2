//! Database query functions for the `stakeholders` table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::Stakeholder;

/// Parameters for inserting a new stakeholder row.
#[derive(Debug, Clone)]
pub struct NewStakeholder<'a> {
    pub name: &'a str,
    pub sub_cluster_id: Option<i32>,
    pub organization: Option<&'a str>,
    pub contact_email: Option<&'a str>,
}

/// Optional field updates for a stakeholder. `None` fields are left as-is.
#[derive(Debug, Clone, Default)]
pub struct StakeholderPatch {
    pub name: Option<String>,
    pub sub_cluster_id: Option<i32>,
    pub organization: Option<String>,
    pub contact_email: Option<String>,
}

/// Insert a new stakeholder row. Returns the inserted row with
/// server-generated defaults (id, created_at).
pub async fn insert_stakeholder(pool: &PgPool, new: &NewStakeholder<'_>) -> Result<Stakeholder> {
    let stakeholder = sqlx::query_as::<_, Stakeholder>(
        "INSERT INTO stakeholders (name, sub_cluster_id, organization, contact_email) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(new.name)
    .bind(new.sub_cluster_id)
    .bind(new.organization)
    .bind(new.contact_email)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert stakeholder {:?}", new.name))?;

    Ok(stakeholder)
}

/// Fetch a stakeholder by its ID.
pub async fn get_stakeholder(pool: &PgPool, id: i32) -> Result<Option<Stakeholder>> {
    let stakeholder = sqlx::query_as::<_, Stakeholder>("SELECT * FROM stakeholders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch stakeholder")?;

    Ok(stakeholder)
}

/// List stakeholders, optionally restricted to one sub-cluster, ordered by
/// name.
pub async fn list_stakeholders(pool: &PgPool, sub_cluster_id: Option<i32>) -> Result<Vec<Stakeholder>> {
    let stakeholders = sqlx::query_as::<_, Stakeholder>(
        "SELECT * FROM stakeholders \
         WHERE ($1::int4 IS NULL OR sub_cluster_id = $1) \
         ORDER BY name ASC",
    )
    .bind(sub_cluster_id)
    .fetch_all(pool)
    .await
    .context("failed to list stakeholders")?;

    Ok(stakeholders)
}

/// Patch a stakeholder's fields. Returns the updated row, or `None` when no
/// row matched.
pub async fn update_stakeholder(
    pool: &PgPool,
    id: i32,
    patch: &StakeholderPatch,
) -> Result<Option<Stakeholder>> {
    let stakeholder = sqlx::query_as::<_, Stakeholder>(
        "UPDATE stakeholders \
         SET name = COALESCE($2, name), \
             sub_cluster_id = COALESCE($3, sub_cluster_id), \
             organization = COALESCE($4, organization), \
             contact_email = COALESCE($5, contact_email) \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(patch.name.as_deref())
    .bind(patch.sub_cluster_id)
    .bind(patch.organization.as_deref())
    .bind(patch.contact_email.as_deref())
    .fetch_optional(pool)
    .await
    .context("failed to update stakeholder")?;

    Ok(stakeholder)
}

/// Delete a stakeholder. Returns `false` when no row matched.
pub async fn delete_stakeholder(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM stakeholders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete stakeholder")?;

    Ok(result.rows_affected() > 0)
}
