//! Aggregate reporting queries over action plans and KPI plans.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::PgPool;

/// Per-KPI planning totals for one financial year.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct KpiSummaryRow {
    pub kpi_id: i32,
    pub kpi_name: String,
    pub kpi_unit: Option<String>,
    pub sub_cluster_id: i32,
    pub plan_count: i64,
    pub total_planned: f64,
}

/// Per-sub-cluster planning coverage for one financial year.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CoverageRow {
    pub sub_cluster_id: i32,
    pub sub_cluster_name: String,
    pub plan_count: i64,
    pub kpi_count: i64,
}

/// Plan count and summed planned value per KPI for a year, optionally
/// restricted to one sub-cluster. KPIs with no plans are omitted.
pub async fn kpi_summary(
    pool: &PgPool,
    year_id: i32,
    sub_cluster_id: Option<i32>,
) -> Result<Vec<KpiSummaryRow>> {
    let rows = sqlx::query_as::<_, KpiSummaryRow>(
        "SELECT k.id AS kpi_id, k.name AS kpi_name, k.unit AS kpi_unit, \
                k.sub_cluster_id, \
                COUNT(kp.id) AS plan_count, \
                COALESCE(SUM(kp.planned_value), 0)::float8 AS total_planned \
         FROM kpis k \
         JOIN kpi_plans kp ON kp.kpi_id = k.id \
         JOIN action_plans p ON p.id = kp.action_plan_id \
         WHERE p.year_id = $1 \
           AND ($2::int4 IS NULL OR k.sub_cluster_id = $2) \
         GROUP BY k.id, k.name, k.unit, k.sub_cluster_id \
         ORDER BY k.name ASC",
    )
    .bind(year_id)
    .bind(sub_cluster_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to build KPI summary for year {year_id}"))?;

    Ok(rows)
}

/// Plan and distinct-KPI counts per sub-cluster for a year. Sub-clusters
/// with no plans appear with zero counts.
pub async fn sub_cluster_coverage(pool: &PgPool, year_id: i32) -> Result<Vec<CoverageRow>> {
    let rows = sqlx::query_as::<_, CoverageRow>(
        "SELECT sc.id AS sub_cluster_id, sc.name AS sub_cluster_name, \
                COUNT(DISTINCT p.id) AS plan_count, \
                COUNT(DISTINCT kp.kpi_id) AS kpi_count \
         FROM sub_clusters sc \
         LEFT JOIN action_plans p ON p.sub_cluster_id = sc.id AND p.year_id = $1 \
         LEFT JOIN kpi_plans kp ON kp.action_plan_id = p.id \
         GROUP BY sc.id, sc.name \
         ORDER BY sc.name ASC",
    )
    .bind(year_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to build coverage report for year {year_id}"))?;

    Ok(rows)
}
