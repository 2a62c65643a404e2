//! `stakmap serve`: the REST API surface.
//!
//! Routes are thin: parse the request, call the service or query layer,
//! record an audit entry for mutations, shape the JSON response.

mod action_plans;
mod audit;
mod directory;
mod reports;

use std::net::SocketAddr;

use anyhow::Result;
use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use stakmap_core::error::ServiceError;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
    /// Set on duplicate-KPI conflicts so the caller can see which KPI failed.
    kpi_id: Option<i32>,
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
            kpi_id: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
            kpi_id: None,
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
            kpi_id: None,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Validation(_) => Self {
                status: StatusCode::BAD_REQUEST,
                message,
                kpi_id: None,
            },
            ServiceError::NotFound { .. } => Self {
                status: StatusCode::NOT_FOUND,
                message,
                kpi_id: None,
            },
            ServiceError::DuplicateKpiPlan { kpi_id } => Self {
                status: StatusCode::CONFLICT,
                message,
                kpi_id: Some(kpi_id),
            },
            ServiceError::Internal(e) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("{e:#}"),
                kpi_id: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = match self.kpi_id {
            Some(kpi_id) => serde_json::json!({ "error": self.message, "kpi_id": kpi_id }),
            None => serde_json::json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Actor extraction
// ---------------------------------------------------------------------------

/// Actor recorded on audit entries. Authentication is handled upstream; the
/// proxy forwards the caller identity in the `x-actor` header.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_owned()
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(pool: PgPool) -> Router {
    Router::new()
        .route(
            "/api/action-plans",
            get(action_plans::search).post(action_plans::create),
        )
        .route(
            "/api/action-plans/{id}",
            get(action_plans::get_detail)
                .patch(action_plans::update)
                .delete(action_plans::delete),
        )
        .route(
            "/api/years",
            get(directory::list_years).post(directory::create_year),
        )
        .route(
            "/api/years/{id}",
            get(directory::get_year).delete(directory::delete_year),
        )
        .route(
            "/api/sub-clusters",
            get(directory::list_sub_clusters).post(directory::create_sub_cluster),
        )
        .route(
            "/api/sub-clusters/{id}",
            get(directory::get_sub_cluster).delete(directory::delete_sub_cluster),
        )
        .route(
            "/api/kpis",
            get(directory::list_kpis).post(directory::create_kpi),
        )
        .route(
            "/api/kpis/{id}",
            get(directory::get_kpi).delete(directory::delete_kpi),
        )
        .route(
            "/api/stakeholders",
            get(directory::list_stakeholders).post(directory::create_stakeholder),
        )
        .route(
            "/api/stakeholders/{id}",
            get(directory::get_stakeholder)
                .patch(directory::update_stakeholder)
                .delete(directory::delete_stakeholder),
        )
        .route("/api/reports/kpi-summary", get(reports::kpi_summary))
        .route("/api/reports/coverage", get(reports::coverage))
        .route("/api/audit-logs", get(audit::list_audit_logs))
        .layer(CorsLayer::permissive())
        .with_state(pool)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, bind: &str, port: u16) -> Result<()> {
    let app = build_router(pool);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("stakmap serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("stakmap serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Shared test helpers
// ---------------------------------------------------------------------------
