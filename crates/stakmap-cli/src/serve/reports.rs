//! Handlers for `/api/reports`.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use sqlx::PgPool;

use stakmap_db::queries::reports;

use super::AppError;

#[derive(Debug, Deserialize)]
pub(crate) struct KpiSummaryParams {
    pub year_id: i32,
    pub sub_cluster_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CoverageParams {
    pub year_id: i32,
}

pub(crate) async fn kpi_summary(
    State(pool): State<PgPool>,
    Query(params): Query<KpiSummaryParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = reports::kpi_summary(&pool, params.year_id, params.sub_cluster_id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(rows))
}

pub(crate) async fn coverage(
    State(pool): State<PgPool>,
    Query(params): Query<CoverageParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = reports::sub_cluster_coverage(&pool, params.year_id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(rows))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
