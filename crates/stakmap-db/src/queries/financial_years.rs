//! Database query functions for the `financial_years` table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::FinancialYear;

/// Insert a new financial year row. Returns the inserted row with
/// server-generated defaults (id, created_at).
pub async fn insert_financial_year(pool: &PgPool, name: &str) -> Result<FinancialYear> {
    let year = sqlx::query_as::<_, FinancialYear>(
        "INSERT INTO financial_years (name) VALUES ($1) RETURNING *",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert financial year {name:?}"))?;

    Ok(year)
}

/// Fetch a financial year by its ID.
pub async fn get_financial_year(pool: &PgPool, id: i32) -> Result<Option<FinancialYear>> {
    let year = sqlx::query_as::<_, FinancialYear>("SELECT * FROM financial_years WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch financial year")?;

    Ok(year)
}

/// List all financial years, ordered by name.
pub async fn list_financial_years(pool: &PgPool) -> Result<Vec<FinancialYear>> {
    let years =
        sqlx::query_as::<_, FinancialYear>("SELECT * FROM financial_years ORDER BY name ASC")
            .fetch_all(pool)
            .await
            .context("failed to list financial years")?;

    Ok(years)
}

/// Delete a financial year. Returns `false` when no row matched.
pub async fn delete_financial_year(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM financial_years WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete financial year")?;

    Ok(result.rows_affected() > 0)
}
