//! Handlers for `/api/audit-logs`.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use sqlx::PgPool;

use stakmap_db::queries::audit_logs;

use super::AppError;

#[derive(Debug, Deserialize)]
pub(crate) struct AuditParams {
    pub entity: Option<String>,
    pub actor: Option<String>,
    pub limit: Option<i64>,
}

/// Most audit queries only care about recent activity; cap the default.
const DEFAULT_LIMIT: i64 = 100;

pub(crate) async fn list_audit_logs(
    State(pool): State<PgPool>,
    Query(params): Query<AuditParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit <= 0 {
        return Err(AppError::bad_request("limit must be positive"));
    }

    let logs = audit_logs::list_audit_logs(
        &pool,
        params.entity.as_deref(),
        params.actor.as_deref(),
        limit,
    )
    .await
    .map_err(AppError::internal)?;

    Ok(Json(logs))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use stakmap_test_utils::{create_test_db, drop_test_db};

    use crate::serve::testing::{body_json, get, post};

    #[tokio::test]
    async fn mutations_surface_in_the_audit_log() {
        let (pool, db_name) = create_test_db().await;

        post(pool.clone(), "/api/years", json!({ "name": "2025/26" })).await;
        post(pool.clone(), "/api/sub-clusters", json!({ "name": "WASH" })).await;

        let resp = get(pool.clone(), "/api/audit-logs").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        let logs = body.as_array().unwrap();
        assert_eq!(logs.len(), 2);
        // Newest first.
        assert_eq!(logs[0]["action"], "create_sub_cluster");
        assert_eq!(logs[1]["action"], "create_financial_year");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn entity_filter_narrows_results() {
        let (pool, db_name) = create_test_db().await;

        post(pool.clone(), "/api/years", json!({ "name": "2025/26" })).await;
        post(pool.clone(), "/api/sub-clusters", json!({ "name": "WASH" })).await;

        let resp = get(pool.clone(), "/api/audit-logs?entity=financial_year").await;
        let body = body_json(resp).await;
        let logs = body.as_array().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["entity"], "financial_year");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn non_positive_limit_is_rejected() {
        let (pool, db_name) = create_test_db().await;

        let resp = get(pool.clone(), "/api/audit-logs?limit=0").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
