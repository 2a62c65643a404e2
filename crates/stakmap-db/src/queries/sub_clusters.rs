//! Database query functions for the `sub_clusters` table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::SubCluster;

/// Insert a new sub-cluster row. Returns the inserted row with
/// server-generated defaults (id, created_at).
pub async fn insert_sub_cluster(
    pool: &PgPool,
    name: &str,
    description: Option<&str>,
) -> Result<SubCluster> {
    let sub_cluster = sqlx::query_as::<_, SubCluster>(
        "INSERT INTO sub_clusters (name, description) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert sub-cluster {name:?}"))?;

    Ok(sub_cluster)
}

/// Fetch a sub-cluster by its ID.
pub async fn get_sub_cluster(pool: &PgPool, id: i32) -> Result<Option<SubCluster>> {
    let sub_cluster = sqlx::query_as::<_, SubCluster>("SELECT * FROM sub_clusters WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch sub-cluster")?;

    Ok(sub_cluster)
}

/// List all sub-clusters, ordered by name.
pub async fn list_sub_clusters(pool: &PgPool) -> Result<Vec<SubCluster>> {
    let sub_clusters =
        sqlx::query_as::<_, SubCluster>("SELECT * FROM sub_clusters ORDER BY name ASC")
            .fetch_all(pool)
            .await
            .context("failed to list sub-clusters")?;

    Ok(sub_clusters)
}

/// Delete a sub-cluster. Returns `false` when no row matched.
pub async fn delete_sub_cluster(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sub_clusters WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete sub-cluster")?;

    Ok(result.rows_affected() > 0)
}
