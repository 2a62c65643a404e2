//! Database query functions for the `kpis` table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::Kpi;

/// Insert a new KPI row. Returns the inserted row with server-generated
/// defaults (id, created_at).
pub async fn insert_kpi(
    pool: &PgPool,
    sub_cluster_id: i32,
    name: &str,
    unit: Option<&str>,
) -> Result<Kpi> {
    let kpi = sqlx::query_as::<_, Kpi>(
        "INSERT INTO kpis (sub_cluster_id, name, unit) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(sub_cluster_id)
    .bind(name)
    .bind(unit)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert KPI {name:?}"))?;

    Ok(kpi)
}

/// Fetch a KPI by its ID.
pub async fn get_kpi(pool: &PgPool, id: i32) -> Result<Option<Kpi>> {
    let kpi = sqlx::query_as::<_, Kpi>("SELECT * FROM kpis WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch KPI")?;

    Ok(kpi)
}

/// List KPIs, optionally restricted to one sub-cluster, ordered by name.
pub async fn list_kpis(pool: &PgPool, sub_cluster_id: Option<i32>) -> Result<Vec<Kpi>> {
    let kpis = sqlx::query_as::<_, Kpi>(
        "SELECT * FROM kpis \
         WHERE ($1::int4 IS NULL OR sub_cluster_id = $1) \
         ORDER BY name ASC",
    )
    .bind(sub_cluster_id)
    .fetch_all(pool)
    .await
    .context("failed to list KPIs")?;

    Ok(kpis)
}

/// Delete a KPI. Returns `false` when no row matched.
pub async fn delete_kpi(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM kpis WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete KPI")?;

    Ok(result.rows_affected() > 0)
}
