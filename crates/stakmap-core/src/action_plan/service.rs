//! Action plan service layer.
//!
//! Creation inserts the plan row and all its KPI plan rows within a single
//! database transaction, after a per-KPI duplicate check that runs under an
//! advisory lock inside the same transaction. Two concurrent requests for
//! the same KPI/year/scope therefore cannot both pass the check.

use anyhow::Context;
use sqlx::{PgConnection, PgPool};

use stakmap_db::models::{ActionPlan, FinancialYear, PlanLevel, Stakeholder};
use stakmap_db::queries::action_plans::{self, ActionPlanFilter, ActionPlanPatch};
use stakmap_db::queries::{stakeholders, sub_clusters};

use crate::error::ServiceError;

use super::{
    ActionPlanDetail, ActionPlanSearch, ActionPlanUpdate, KpiPlanDetail, NewActionPlan, PlanScope,
    SubClusterRef,
};

/// Create an action plan and all its KPI plans.
///
/// Referenced sub-cluster and stakeholder rows are checked first; the
/// duplicate check and all inserts then run inside one transaction. If any
/// step fails the entire operation is rolled back -- no plan is ever left
/// without its KPI plans and vice versa.
///
/// Returns the created plan joined with its KPI plans (each with its KPI),
/// financial year, stakeholder, and sub-cluster.
pub async fn create_action_plan(
    pool: &PgPool,
    new: &NewActionPlan,
) -> Result<ActionPlanDetail, ServiceError> {
    if new.year_id <= 0 {
        return Err(ServiceError::Validation(
            "year_id must be a positive integer".to_owned(),
        ));
    }
    if new.kpi_plans.is_empty() {
        return Err(ServiceError::Validation(
            "kpi_plans must not be empty".to_owned(),
        ));
    }

    sub_clusters::get_sub_cluster(pool, new.sub_cluster_id)
        .await?
        .ok_or(ServiceError::NotFound {
            entity: "sub-cluster",
            id: new.sub_cluster_id,
        })?;

    if let Some(stakeholder_id) = new.stakeholder_id {
        stakeholders::get_stakeholder(pool, stakeholder_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "stakeholder",
                id: stakeholder_id,
            })?;
    }

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    // Serialize concurrent creations for the same (year, scope) so the
    // duplicate check cannot race a concurrent insert. The lock is released
    // at commit/rollback.
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(scope_lock_key(new.year_id, new.scope))
        .execute(&mut *tx)
        .await
        .context("failed to take scope lock")?;

    // 1. Duplicate check, once per requested KPI.
    for kpi_plan in &new.kpi_plans {
        let conflict: Option<(i32,)> = sqlx::query_as(
            "SELECT kp.id FROM kpi_plans kp \
             JOIN action_plans p ON p.id = kp.action_plan_id \
             WHERE kp.kpi_id = $1 \
               AND p.year_id = $2 \
               AND p.plan_level = $3 \
               AND p.geo_id = $4 \
             LIMIT 1",
        )
        .bind(kpi_plan.kpi_id)
        .bind(new.year_id)
        .bind(new.scope.level())
        .bind(new.scope.geo_id())
        .fetch_optional(&mut *tx)
        .await
        .context("failed to check for duplicate kpi plan")?;

        if conflict.is_some() {
            // Transaction rolls back on drop (no commit).
            return Err(ServiceError::DuplicateKpiPlan {
                kpi_id: kpi_plan.kpi_id,
            });
        }
    }

    // 2. Insert the plan row.
    let plan = sqlx::query_as::<_, ActionPlan>(
        "INSERT INTO action_plans \
             (year_id, sub_cluster_id, stakeholder_id, plan_level, geo_id, \
              document, comment, description) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING *",
    )
    .bind(new.year_id)
    .bind(new.sub_cluster_id)
    .bind(new.stakeholder_id)
    .bind(new.scope.level())
    .bind(new.scope.geo_id())
    .bind(new.document.as_deref())
    .bind(new.comment.as_deref())
    .bind(new.description.as_deref())
    .fetch_one(&mut *tx)
    .await
    .context("failed to insert action plan")?;

    // 3. Insert all kpi plan rows referencing the generated id.
    for kpi_plan in &new.kpi_plans {
        sqlx::query(
            "INSERT INTO kpi_plans (action_plan_id, kpi_id, planned_value) \
             VALUES ($1, $2, $3)",
        )
        .bind(plan.id)
        .bind(kpi_plan.kpi_id)
        .bind(kpi_plan.planned_value)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to insert kpi plan for KPI {}", kpi_plan.kpi_id))?;
    }

    // 4. Re-read the joined entity for the response.
    let detail = load_action_plan_detail(&mut tx, plan, None).await?;

    tx.commit().await.context("failed to commit transaction")?;

    Ok(detail)
}

/// Fetch one action plan joined with its KPI plans, year, stakeholder, and
/// sub-cluster.
pub async fn get_action_plan_detail(
    pool: &PgPool,
    id: i32,
) -> Result<ActionPlanDetail, ServiceError> {
    let plan = action_plans::get_action_plan(pool, id)
        .await?
        .ok_or(ServiceError::NotFound {
            entity: "action plan",
            id,
        })?;

    let mut conn = pool
        .acquire()
        .await
        .context("failed to acquire connection")?;
    load_action_plan_detail(&mut conn, plan, None).await
}

/// Search action plans, newest first, returning each joined with its
/// KPI plans, year, stakeholder, and sub-cluster.
///
/// When `search.kpi_id` is set, only matching KpiPlans are included in each
/// result; the plans themselves are not filtered by it.
pub async fn search_action_plans(
    pool: &PgPool,
    search: &ActionPlanSearch,
) -> Result<Vec<ActionPlanDetail>, ServiceError> {
    let filter = ActionPlanFilter {
        year_id: search.year_id,
        sub_cluster_id: search.sub_cluster_id,
        stakeholder_id: search.stakeholder_id,
        plan_level: search.scope.map(|s| s.level()),
        geo_id: search.scope.map(|s| s.geo_id()),
        kpi_sub_cluster_id: search.kpi_sub_cluster_id,
    };

    let plans = action_plans::search_action_plans(pool, &filter).await?;

    let mut conn = pool
        .acquire()
        .await
        .context("failed to acquire connection")?;

    let mut details = Vec::with_capacity(plans.len());
    for plan in plans {
        details.push(load_action_plan_detail(&mut conn, plan, search.kpi_id).await?);
    }

    Ok(details)
}

/// Patch an action plan's direct fields. Returns the updated row.
pub async fn update_action_plan(
    pool: &PgPool,
    id: i32,
    update: &ActionPlanUpdate,
) -> Result<ActionPlan, ServiceError> {
    let patch = ActionPlanPatch {
        document: update.document.clone(),
        comment: update.comment.clone(),
        description: update.description.clone(),
        plan_level: update.scope.map(|s| s.level()),
        geo_id: update.scope.map(|s| s.geo_id()),
    };

    action_plans::update_action_plan(pool, id, &patch)
        .await?
        .ok_or(ServiceError::NotFound {
            entity: "action plan",
            id,
        })
}

/// Delete an action plan and all its KPI plans atomically.
pub async fn delete_action_plan(pool: &PgPool, id: i32) -> Result<(), ServiceError> {
    let deleted = action_plans::delete_action_plan(pool, id).await?;
    if !deleted {
        return Err(ServiceError::NotFound {
            entity: "action plan",
            id,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load the joined response shape for an already-fetched plan row, on any
/// connection (a transaction during create, a pool connection otherwise).
async fn load_action_plan_detail(
    conn: &mut PgConnection,
    plan: ActionPlan,
    kpi_id: Option<i32>,
) -> Result<ActionPlanDetail, ServiceError> {
    let year = sqlx::query_as::<_, FinancialYear>("SELECT * FROM financial_years WHERE id = $1")
        .bind(plan.year_id)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to fetch financial year {}", plan.year_id))?;

    let sub_cluster =
        sqlx::query_as::<_, SubClusterRef>("SELECT id, name FROM sub_clusters WHERE id = $1")
            .bind(plan.sub_cluster_id)
            .fetch_one(&mut *conn)
            .await
            .with_context(|| format!("failed to fetch sub-cluster {}", plan.sub_cluster_id))?;

    let stakeholder = match plan.stakeholder_id {
        Some(stakeholder_id) => Some(
            sqlx::query_as::<_, Stakeholder>("SELECT * FROM stakeholders WHERE id = $1")
                .bind(stakeholder_id)
                .fetch_one(&mut *conn)
                .await
                .with_context(|| format!("failed to fetch stakeholder {stakeholder_id}"))?,
        ),
        None => None,
    };

    let kpi_plans = sqlx::query_as::<_, KpiPlanDetail>(
        "SELECT kp.id, kp.kpi_id, kp.planned_value, \
                k.name AS kpi_name, k.unit AS kpi_unit \
         FROM kpi_plans kp \
         JOIN kpis k ON k.id = kp.kpi_id \
         WHERE kp.action_plan_id = $1 \
           AND ($2::int4 IS NULL OR kp.kpi_id = $2) \
         ORDER BY kp.id ASC",
    )
    .bind(plan.id)
    .bind(kpi_id)
    .fetch_all(&mut *conn)
    .await
    .with_context(|| format!("failed to fetch kpi plans for action plan {}", plan.id))?;

    Ok(ActionPlanDetail {
        plan,
        year,
        sub_cluster,
        stakeholder,
        kpi_plans,
    })
}

/// Advisory-lock key for a (year, scope) pair.
///
/// Key collisions only serialize unrelated creations; they never affect
/// correctness.
fn scope_lock_key(year_id: i32, scope: PlanScope) -> i64 {
    let level_tag = match scope.level() {
        PlanLevel::Country => 0i64,
        PlanLevel::Province => 1,
        PlanLevel::District => 2,
    };
    ((year_id as i64) << 34) ^ ((scope.geo_id() as i64) << 2) ^ level_tag
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
