//! Handlers for `/api/action-plans`.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use stakmap_core::action_plan::{
    self, ActionPlanSearch, ActionPlanUpdate, NewActionPlan, NewKpiPlan, PlanScope,
};
use stakmap_core::audit;
use stakmap_db::models::PlanLevel;

use super::{AppError, actor_from_headers};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct CreateActionPlanRequest {
    pub year_id: i32,
    pub sub_cluster_id: i32,
    pub stakeholder_id: Option<i32>,
    pub plan_level: PlanLevel,
    pub country_id: Option<i32>,
    pub province_id: Option<i32>,
    pub district_id: Option<i32>,
    pub document: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub kpi_plans: Vec<NewKpiPlan>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateActionPlanRequest {
    pub document: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub plan_level: Option<PlanLevel>,
    pub country_id: Option<i32>,
    pub province_id: Option<i32>,
    pub district_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchParams {
    pub year_id: Option<i32>,
    pub sub_cluster_id: Option<i32>,
    pub stakeholder_id: Option<i32>,
    pub country_id: Option<i32>,
    pub province_id: Option<i32>,
    pub district_id: Option<i32>,
    pub kpi_sub_cluster_id: Option<i32>,
    pub kpi_id: Option<i32>,
}

/// Resolve the three optional geo-id query parameters into at most one
/// scope filter.
fn scope_from_params(
    country_id: Option<i32>,
    province_id: Option<i32>,
    district_id: Option<i32>,
) -> Result<Option<PlanScope>, AppError> {
    let mut scopes = Vec::new();
    if let Some(id) = country_id {
        scopes.push(PlanScope::Country(id));
    }
    if let Some(id) = province_id {
        scopes.push(PlanScope::Province(id));
    }
    if let Some(id) = district_id {
        scopes.push(PlanScope::District(id));
    }
    match scopes.as_slice() {
        [] => Ok(None),
        [scope] => Ok(Some(*scope)),
        _ => Err(AppError::bad_request(
            "at most one of country_id, province_id, district_id may be given",
        )),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub(crate) async fn create(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    Json(req): Json<CreateActionPlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    let scope = PlanScope::from_parts(
        req.plan_level,
        req.country_id,
        req.province_id,
        req.district_id,
    )
    .map_err(AppError::bad_request)?;

    let new = NewActionPlan {
        year_id: req.year_id,
        sub_cluster_id: req.sub_cluster_id,
        stakeholder_id: req.stakeholder_id,
        scope,
        document: req.document,
        comment: req.comment,
        description: req.description,
        kpi_plans: req.kpi_plans,
    };

    let detail = action_plan::create_action_plan(&pool, &new).await?;

    let actor = actor_from_headers(&headers);
    audit::record(
        &pool,
        &actor,
        "create_action_plan",
        "action_plan",
        Some(detail.plan.id),
        json!({ "kpi_count": detail.kpi_plans.len() }),
    )
    .await
    .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(detail)))
}

pub(crate) async fn search(
    State(pool): State<PgPool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let scope = scope_from_params(params.country_id, params.province_id, params.district_id)?;

    let search = ActionPlanSearch {
        year_id: params.year_id,
        sub_cluster_id: params.sub_cluster_id,
        stakeholder_id: params.stakeholder_id,
        scope,
        kpi_sub_cluster_id: params.kpi_sub_cluster_id,
        kpi_id: params.kpi_id,
    };

    let results = action_plan::search_action_plans(&pool, &search).await?;
    Ok(Json(results))
}

pub(crate) async fn get_detail(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let detail = action_plan::get_action_plan_detail(&pool, id).await?;
    Ok(Json(detail))
}

pub(crate) async fn update(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(req): Json<UpdateActionPlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    let scope = match req.plan_level {
        Some(level) => Some(
            PlanScope::from_parts(level, req.country_id, req.province_id, req.district_id)
                .map_err(AppError::bad_request)?,
        ),
        None => None,
    };

    let patch = ActionPlanUpdate {
        document: req.document,
        comment: req.comment,
        description: req.description,
        scope,
    };

    let updated = action_plan::update_action_plan(&pool, id, &patch).await?;

    let actor = actor_from_headers(&headers);
    audit::record(
        &pool,
        &actor,
        "update_action_plan",
        "action_plan",
        Some(id),
        json!({}),
    )
    .await
    .map_err(AppError::internal)?;

    Ok(Json(updated))
}

pub(crate) async fn delete(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    action_plan::delete_action_plan(&pool, id).await?;

    let actor = actor_from_headers(&headers);
    audit::record(
        &pool,
        &actor,
        "delete_action_plan",
        "action_plan",
        Some(id),
        json!({}),
    )
    .await
    .map_err(AppError::internal)?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use sqlx::PgPool;

    use stakmap_db::queries::{audit_logs, financial_years, kpis, sub_clusters};
    use stakmap_test_utils::{create_test_db, drop_test_db};

    use crate::serve::testing::{body_json, get, post, send};

    struct Seed {
        year_id: i32,
        sub_cluster_id: i32,
        kpi_id: i32,
    }

    async fn seed(pool: &PgPool) -> Seed {
        let year = financial_years::insert_financial_year(pool, "2025/26")
            .await
            .unwrap();
        let sc = sub_clusters::insert_sub_cluster(pool, "WASH", None)
            .await
            .unwrap();
        let kpi = kpis::insert_kpi(pool, sc.id, "Boreholes drilled", Some("count"))
            .await
            .unwrap();
        Seed {
            year_id: year.id,
            sub_cluster_id: sc.id,
            kpi_id: kpi.id,
        }
    }

    fn district_plan_body(seed: &Seed) -> serde_json::Value {
        json!({
            "year_id": seed.year_id,
            "sub_cluster_id": seed.sub_cluster_id,
            "plan_level": "district",
            "district_id": 5,
            "kpi_plans": [{ "kpi_id": seed.kpi_id, "planned_value": 100.0 }]
        })
    }

    #[tokio::test]
    async fn create_returns_201_with_joined_entity() {
        let (pool, db_name) = create_test_db().await;
        let seed = seed(&pool).await;

        let resp = post(pool.clone(), "/api/action-plans", district_plan_body(&seed)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = body_json(resp).await;
        assert_eq!(body["plan_level"], "district");
        assert_eq!(body["geo_id"], 5);
        assert_eq!(body["year"]["name"], "2025/26");
        assert_eq!(body["sub_cluster"]["name"], "WASH");
        let kpi_plans = body["kpi_plans"].as_array().unwrap();
        assert_eq!(kpi_plans.len(), 1);
        assert_eq!(kpi_plans[0]["planned_value"], 100.0);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn duplicate_create_returns_409_naming_the_kpi() {
        let (pool, db_name) = create_test_db().await;
        let seed = seed(&pool).await;

        let resp = post(pool.clone(), "/api/action-plans", district_plan_body(&seed)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = post(pool.clone(), "/api/action-plans", district_plan_body(&seed)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = body_json(resp).await;
        assert_eq!(body["kpi_id"], seed.kpi_id);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn create_with_unknown_sub_cluster_returns_404() {
        let (pool, db_name) = create_test_db().await;
        let seed = seed(&pool).await;

        let mut body = district_plan_body(&seed);
        body["sub_cluster_id"] = json!(9999);

        let resp = post(pool.clone(), "/api/action-plans", body).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn create_with_empty_kpi_plans_returns_400() {
        let (pool, db_name) = create_test_db().await;
        let seed = seed(&pool).await;

        let mut body = district_plan_body(&seed);
        body["kpi_plans"] = json!([]);

        let resp = post(pool.clone(), "/api/action-plans", body).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn create_without_matching_geo_id_returns_400() {
        let (pool, db_name) = create_test_db().await;
        let seed = seed(&pool).await;

        // plan_level says district but only a country id is supplied.
        let mut body = district_plan_body(&seed);
        body.as_object_mut().unwrap().remove("district_id");
        body["country_id"] = json!(1);

        let resp = post(pool.clone(), "/api/action-plans", body).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn create_records_an_audit_entry() {
        let (pool, db_name) = create_test_db().await;
        let seed = seed(&pool).await;

        let resp = send(
            pool.clone(),
            Method::POST,
            "/api/action-plans",
            Some(district_plan_body(&seed)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let logs = audit_logs::list_audit_logs(&pool, Some("action_plan"), None, 10)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "create_action_plan");
        assert_eq!(logs[0].actor, "anonymous");
        assert_eq!(logs[0].detail["kpi_count"], 1);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn search_rejects_conflicting_geo_filters() {
        let (pool, db_name) = create_test_db().await;

        let resp = get(
            pool.clone(),
            "/api/action-plans?country_id=1&district_id=5",
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn search_filters_and_returns_details() {
        let (pool, db_name) = create_test_db().await;
        let seed = seed(&pool).await;

        post(pool.clone(), "/api/action-plans", district_plan_body(&seed)).await;

        let resp = get(
            pool.clone(),
            &format!("/api/action-plans?year_id={}&district_id=5", seed.year_id),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        let arr = body.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["kpi_plans"].as_array().unwrap().len(), 1);

        // Filtering for a different district yields nothing.
        let resp = get(pool.clone(), "/api/action-plans?district_id=6").await;
        let body = body_json(resp).await;
        assert_eq!(body.as_array().unwrap().len(), 0);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn get_missing_plan_returns_404() {
        let (pool, db_name) = create_test_db().await;

        let resp = get(pool.clone(), "/api/action-plans/12345").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn patch_updates_fields() {
        let (pool, db_name) = create_test_db().await;
        let seed = seed(&pool).await;

        let resp = post(pool.clone(), "/api/action-plans", district_plan_body(&seed)).await;
        let created = body_json(resp).await;
        let id = created["id"].as_i64().unwrap();

        let resp = send(
            pool.clone(),
            Method::PATCH,
            &format!("/api/action-plans/{id}"),
            Some(json!({ "comment": "revised" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["comment"], "revised");
        assert_eq!(body["plan_level"], "district");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn delete_returns_204_then_404() {
        let (pool, db_name) = create_test_db().await;
        let seed = seed(&pool).await;

        let resp = post(pool.clone(), "/api/action-plans", district_plan_body(&seed)).await;
        let created = body_json(resp).await;
        let id = created["id"].as_i64().unwrap();

        let resp = send(
            pool.clone(),
            Method::DELETE,
            &format!("/api/action-plans/{id}"),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = get(pool.clone(), &format!("/api/action-plans/{id}")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
