//! Database query functions for the `action_plans` and `kpi_plans` tables.
//!
//! The transactional create/delete flows live in the service layer
//! (stakmap-core); this module holds the pool-level primitives.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::{ActionPlan, PlanLevel};

/// Conjunctive search filter for action plans. Every field is optional;
/// `None` means "no constraint".
///
/// `plan_level` and `geo_id` are set together when filtering by geographic
/// scope. `kpi_sub_cluster_id` matches plans containing at least one KpiPlan
/// whose KPI belongs to that sub-cluster.
#[derive(Debug, Clone, Default)]
pub struct ActionPlanFilter {
    pub year_id: Option<i32>,
    pub sub_cluster_id: Option<i32>,
    pub stakeholder_id: Option<i32>,
    pub plan_level: Option<PlanLevel>,
    pub geo_id: Option<i32>,
    pub kpi_sub_cluster_id: Option<i32>,
}

/// Optional field updates for an action plan. `None` fields are left as-is.
///
/// KpiPlans are never touched by a patch, and the duplicate check does not
/// re-run.
#[derive(Debug, Clone, Default)]
pub struct ActionPlanPatch {
    pub document: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub plan_level: Option<PlanLevel>,
    pub geo_id: Option<i32>,
}

/// Fetch an action plan by its ID.
pub async fn get_action_plan(pool: &PgPool, id: i32) -> Result<Option<ActionPlan>> {
    let plan = sqlx::query_as::<_, ActionPlan>("SELECT * FROM action_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch action plan")?;

    Ok(plan)
}

/// Search action plans with a conjunctive filter, ordered by creation time
/// (newest first). No pagination.
pub async fn search_action_plans(
    pool: &PgPool,
    filter: &ActionPlanFilter,
) -> Result<Vec<ActionPlan>> {
    let plans = sqlx::query_as::<_, ActionPlan>(
        "SELECT * FROM action_plans \
         WHERE ($1::int4 IS NULL OR year_id = $1) \
           AND ($2::int4 IS NULL OR sub_cluster_id = $2) \
           AND ($3::int4 IS NULL OR stakeholder_id = $3) \
           AND ($4::text IS NULL OR plan_level = $4) \
           AND ($5::int4 IS NULL OR geo_id = $5) \
           AND ($6::int4 IS NULL OR EXISTS ( \
               SELECT 1 FROM kpi_plans kp \
               JOIN kpis k ON k.id = kp.kpi_id \
               WHERE kp.action_plan_id = action_plans.id \
                 AND k.sub_cluster_id = $6)) \
         ORDER BY created_at DESC",
    )
    .bind(filter.year_id)
    .bind(filter.sub_cluster_id)
    .bind(filter.stakeholder_id)
    .bind(filter.plan_level)
    .bind(filter.geo_id)
    .bind(filter.kpi_sub_cluster_id)
    .fetch_all(pool)
    .await
    .context("failed to search action plans")?;

    Ok(plans)
}

/// Patch an action plan's direct fields. Returns the updated row, or `None`
/// when no row matched.
pub async fn update_action_plan(
    pool: &PgPool,
    id: i32,
    patch: &ActionPlanPatch,
) -> Result<Option<ActionPlan>> {
    let plan = sqlx::query_as::<_, ActionPlan>(
        "UPDATE action_plans \
         SET document = COALESCE($2, document), \
             comment = COALESCE($3, comment), \
             description = COALESCE($4, description), \
             plan_level = COALESCE($5, plan_level), \
             geo_id = COALESCE($6, geo_id) \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(patch.document.as_deref())
    .bind(patch.comment.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.plan_level)
    .bind(patch.geo_id)
    .fetch_optional(pool)
    .await
    .context("failed to update action plan")?;

    Ok(plan)
}

/// Delete an action plan together with all its KpiPlans.
///
/// The two deletes run inside one transaction so no orphaned KpiPlans can
/// become visible. Returns `false` when no plan matched.
pub async fn delete_action_plan(pool: &PgPool, id: i32) -> Result<bool> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    sqlx::query("DELETE FROM kpi_plans WHERE action_plan_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("failed to delete kpi plans")?;

    let result = sqlx::query("DELETE FROM action_plans WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("failed to delete action plan")?;

    tx.commit().await.context("failed to commit transaction")?;

    Ok(result.rows_affected() > 0)
}

/// Count KpiPlans attached to an action plan.
pub async fn count_kpi_plans(pool: &PgPool, action_plan_id: i32) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kpi_plans WHERE action_plan_id = $1")
        .bind(action_plan_id)
        .fetch_one(pool)
        .await
        .context("failed to count kpi plans")?;

    Ok(row.0)
}
