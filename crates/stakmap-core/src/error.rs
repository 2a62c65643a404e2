//! Error taxonomy at the service boundary.
//!
//! Expected, recoverable-by-caller conditions ([`ServiceError::NotFound`],
//! [`ServiceError::DuplicateKpiPlan`]) are distinguished from generic
//! failures so the HTTP layer can choose 400/404/409 vs 500.

use thiserror::Error;

/// Errors surfaced by the service layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed input, detected before any write.
    #[error("{0}")]
    Validation(String),

    /// A referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// The KPI is already planned for the same year and geographic scope.
    #[error("KPI {kpi_id} is already planned for this year and scope")]
    DuplicateKpiPlan { kpi_id: i32 },

    /// Any other data-store failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
