//! `stakmap report` command: print KPI summary and coverage tables for a
//! financial year.

use anyhow::{Context, Result};
use sqlx::PgPool;

use stakmap_db::queries::{financial_years, reports};

/// Run the report command.
pub async fn run_report(pool: &PgPool, year_id: i32, sub_cluster_id: Option<i32>) -> Result<()> {
    let year = financial_years::get_financial_year(pool, year_id)
        .await?
        .with_context(|| format!("financial year {year_id} not found"))?;

    println!("Financial year: {} (id {})", year.name, year.id);
    println!();

    // KPI summary.
    let summary = reports::kpi_summary(pool, year_id, sub_cluster_id).await?;

    println!("{:<40} {:<10} {:>8} {:>16}", "KPI", "UNIT", "PLANS", "TOTAL PLANNED");
    println!("{}", "-".repeat(76));

    if summary.is_empty() {
        println!("(no KPI plans recorded)");
    }
    for row in &summary {
        let name_display = if row.kpi_name.len() > 38 {
            format!("{}...", &row.kpi_name[..35])
        } else {
            row.kpi_name.clone()
        };
        println!(
            "{:<40} {:<10} {:>8} {:>16.1}",
            name_display,
            row.kpi_unit.as_deref().unwrap_or("-"),
            row.plan_count,
            row.total_planned,
        );
    }
    println!();

    // Coverage per sub-cluster.
    let coverage = reports::sub_cluster_coverage(pool, year_id).await?;

    println!("{:<40} {:>8} {:>8}", "SUB-CLUSTER", "PLANS", "KPIS");
    println!("{}", "-".repeat(58));

    let mut planned_count: usize = 0;
    for row in &coverage {
        if row.plan_count > 0 {
            planned_count += 1;
        }
        println!(
            "{:<40} {:>8} {:>8}",
            row.sub_cluster_name, row.plan_count, row.kpi_count
        );
    }

    println!();
    println!(
        "Coverage: {}/{} sub-clusters with at least one plan",
        planned_count,
        coverage.len()
    );

    Ok(())
}
