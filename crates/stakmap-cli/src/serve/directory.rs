//! Handlers for the directory resources: financial years, sub-clusters,
//! KPIs, and stakeholders.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use stakmap_core::audit;
use stakmap_db::queries::stakeholders::{NewStakeholder, StakeholderPatch};
use stakmap_db::queries::{financial_years, kpis, stakeholders, sub_clusters};

use super::{AppError, actor_from_headers};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct CreateYearRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateSubClusterRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateKpiRequest {
    pub sub_cluster_id: i32,
    pub name: String,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateStakeholderRequest {
    pub name: String,
    pub sub_cluster_id: Option<i32>,
    pub organization: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateStakeholderRequest {
    pub name: Option<String>,
    pub sub_cluster_id: Option<i32>,
    pub organization: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubClusterParam {
    pub sub_cluster_id: Option<i32>,
}

// ---------------------------------------------------------------------------
// Financial years
// ---------------------------------------------------------------------------

pub(crate) async fn list_years(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let years = financial_years::list_financial_years(&pool)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(years))
}

pub(crate) async fn create_year(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    Json(req): Json<CreateYearRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let year = financial_years::insert_financial_year(&pool, &req.name)
        .await
        .map_err(AppError::internal)?;

    let actor = actor_from_headers(&headers);
    audit::record(
        &pool,
        &actor,
        "create_financial_year",
        "financial_year",
        Some(year.id),
        json!({}),
    )
    .await
    .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(year)))
}

pub(crate) async fn get_year(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let year = financial_years::get_financial_year(&pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("financial year {id} not found")))?;
    Ok(Json(year))
}

pub(crate) async fn delete_year(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let deleted = financial_years::delete_financial_year(&pool, id)
        .await
        .map_err(AppError::internal)?;
    if !deleted {
        return Err(AppError::not_found(format!("financial year {id} not found")));
    }

    let actor = actor_from_headers(&headers);
    audit::record(
        &pool,
        &actor,
        "delete_financial_year",
        "financial_year",
        Some(id),
        json!({}),
    )
    .await
    .map_err(AppError::internal)?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Sub-clusters
// ---------------------------------------------------------------------------

pub(crate) async fn list_sub_clusters(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let sub_clusters = sub_clusters::list_sub_clusters(&pool)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(sub_clusters))
}

pub(crate) async fn create_sub_cluster(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    Json(req): Json<CreateSubClusterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let sub_cluster = sub_clusters::insert_sub_cluster(&pool, &req.name, req.description.as_deref())
        .await
        .map_err(AppError::internal)?;

    let actor = actor_from_headers(&headers);
    audit::record(
        &pool,
        &actor,
        "create_sub_cluster",
        "sub_cluster",
        Some(sub_cluster.id),
        json!({}),
    )
    .await
    .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(sub_cluster)))
}

pub(crate) async fn get_sub_cluster(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let sub_cluster = sub_clusters::get_sub_cluster(&pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("sub-cluster {id} not found")))?;
    Ok(Json(sub_cluster))
}

pub(crate) async fn delete_sub_cluster(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let deleted = sub_clusters::delete_sub_cluster(&pool, id)
        .await
        .map_err(AppError::internal)?;
    if !deleted {
        return Err(AppError::not_found(format!("sub-cluster {id} not found")));
    }

    let actor = actor_from_headers(&headers);
    audit::record(
        &pool,
        &actor,
        "delete_sub_cluster",
        "sub_cluster",
        Some(id),
        json!({}),
    )
    .await
    .map_err(AppError::internal)?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

pub(crate) async fn list_kpis(
    State(pool): State<PgPool>,
    Query(params): Query<SubClusterParam>,
) -> Result<impl IntoResponse, AppError> {
    let kpis = kpis::list_kpis(&pool, params.sub_cluster_id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(kpis))
}

pub(crate) async fn create_kpi(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    Json(req): Json<CreateKpiRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    // Check the FK target first for a friendlier error than a raw violation.
    sub_clusters::get_sub_cluster(&pool, req.sub_cluster_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| {
            AppError::not_found(format!("sub-cluster {} not found", req.sub_cluster_id))
        })?;

    let kpi = kpis::insert_kpi(&pool, req.sub_cluster_id, &req.name, req.unit.as_deref())
        .await
        .map_err(AppError::internal)?;

    let actor = actor_from_headers(&headers);
    audit::record(&pool, &actor, "create_kpi", "kpi", Some(kpi.id), json!({}))
        .await
        .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(kpi)))
}

pub(crate) async fn get_kpi(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let kpi = kpis::get_kpi(&pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("KPI {id} not found")))?;
    Ok(Json(kpi))
}

pub(crate) async fn delete_kpi(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let deleted = kpis::delete_kpi(&pool, id)
        .await
        .map_err(AppError::internal)?;
    if !deleted {
        return Err(AppError::not_found(format!("KPI {id} not found")));
    }

    let actor = actor_from_headers(&headers);
    audit::record(&pool, &actor, "delete_kpi", "kpi", Some(id), json!({}))
        .await
        .map_err(AppError::internal)?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Stakeholders
// ---------------------------------------------------------------------------

pub(crate) async fn list_stakeholders(
    State(pool): State<PgPool>,
    Query(params): Query<SubClusterParam>,
) -> Result<impl IntoResponse, AppError> {
    let stakeholders = stakeholders::list_stakeholders(&pool, params.sub_cluster_id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(stakeholders))
}

pub(crate) async fn create_stakeholder(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    Json(req): Json<CreateStakeholderRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let stakeholder = stakeholders::insert_stakeholder(
        &pool,
        &NewStakeholder {
            name: &req.name,
            sub_cluster_id: req.sub_cluster_id,
            organization: req.organization.as_deref(),
            contact_email: req.contact_email.as_deref(),
        },
    )
    .await
    .map_err(AppError::internal)?;

    let actor = actor_from_headers(&headers);
    audit::record(
        &pool,
        &actor,
        "create_stakeholder",
        "stakeholder",
        Some(stakeholder.id),
        json!({}),
    )
    .await
    .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(stakeholder)))
}

pub(crate) async fn get_stakeholder(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let stakeholder = stakeholders::get_stakeholder(&pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("stakeholder {id} not found")))?;
    Ok(Json(stakeholder))
}

pub(crate) async fn update_stakeholder(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(req): Json<UpdateStakeholderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let patch = StakeholderPatch {
        name: req.name,
        sub_cluster_id: req.sub_cluster_id,
        organization: req.organization,
        contact_email: req.contact_email,
    };

    let stakeholder = stakeholders::update_stakeholder(&pool, id, &patch)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("stakeholder {id} not found")))?;

    let actor = actor_from_headers(&headers);
    audit::record(
        &pool,
        &actor,
        "update_stakeholder",
        "stakeholder",
        Some(id),
        json!({}),
    )
    .await
    .map_err(AppError::internal)?;

    Ok(Json(stakeholder))
}

pub(crate) async fn delete_stakeholder(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let deleted = stakeholders::delete_stakeholder(&pool, id)
        .await
        .map_err(AppError::internal)?;
    if !deleted {
        return Err(AppError::not_found(format!("stakeholder {id} not found")));
    }

    let actor = actor_from_headers(&headers);
    audit::record(
        &pool,
        &actor,
        "delete_stakeholder",
        "stakeholder",
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

    use stakmap_test_utils::{create_test_db, drop_test_db};

    use crate::serve::testing::{body_json, get, post, send};

    #[tokio::test]
    async fn year_crud_roundtrip() {
        let (pool, db_name) = create_test_db().await;

        let resp = post(pool.clone(), "/api/years", json!({ "name": "2025/26" })).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let year = body_json(resp).await;
        let id = year["id"].as_i64().unwrap();

        let resp = get(pool.clone(), &format!("/api/years/{id}")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = get(pool.clone(), "/api/years").await;
        let body = body_json(resp).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let resp = send(pool.clone(), Method::DELETE, &format!("/api/years/{id}"), None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = get(pool.clone(), &format!("/api/years/{id}")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn create_year_with_blank_name_returns_400() {
        let (pool, db_name) = create_test_db().await;

        let resp = post(pool.clone(), "/api/years", json!({ "name": "  " })).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn kpi_create_requires_existing_sub_cluster() {
        let (pool, db_name) = create_test_db().await;

        let resp = post(
            pool.clone(),
            "/api/kpis",
            json!({ "sub_cluster_id": 9999, "name": "Boreholes drilled" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn kpi_list_filters_by_sub_cluster() {
        let (pool, db_name) = create_test_db().await;

        let resp = post(pool.clone(), "/api/sub-clusters", json!({ "name": "WASH" })).await;
        let wash = body_json(resp).await;
        let resp = post(pool.clone(), "/api/sub-clusters", json!({ "name": "Health" })).await;
        let health = body_json(resp).await;

        post(
            pool.clone(),
            "/api/kpis",
            json!({ "sub_cluster_id": wash["id"], "name": "Boreholes drilled" }),
        )
        .await;
        post(
            pool.clone(),
            "/api/kpis",
            json!({ "sub_cluster_id": health["id"], "name": "Clinics built" }),
        )
        .await;

        let resp = get(
            pool.clone(),
            &format!("/api/kpis?sub_cluster_id={}", wash["id"]),
        )
        .await;
        let body = body_json(resp).await;
        let arr = body.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["name"], "Boreholes drilled");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn stakeholder_patch_roundtrip() {
        let (pool, db_name) = create_test_db().await;

        let resp = post(
            pool.clone(),
            "/api/stakeholders",
            json!({ "name": "WaterAid", "organization": "WaterAid International" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        let id = created["id"].as_i64().unwrap();

        let resp = send(
            pool.clone(),
            Method::PATCH,
            &format!("/api/stakeholders/{id}"),
            Some(json!({ "contact_email": "hello@wateraid.example" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["contact_email"], "hello@wateraid.example");
        assert_eq!(body["organization"], "WaterAid International");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn delete_missing_stakeholder_returns_404() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(pool.clone(), Method::DELETE, "/api/stakeholders/404", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
