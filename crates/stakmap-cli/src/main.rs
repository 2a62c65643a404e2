mod config;
mod report_cmd;
mod serve;
#[cfg(test)]
mod test_util;

use clap::{Parser, Subcommand};

use stakmap_db::pool;

use config::StakmapConfig;

#[derive(Parser)]
#[command(name = "stakmap", about = "Stakeholder mapping and reporting backend")]
struct Cli {
    /// Database URL (overrides STAKMAP_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a stakmap config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/stakmap")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the stakmap database (create it if absent, run migrations)
    DbInit,
    /// Run the REST API server
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Print the KPI summary and coverage report for a financial year
    Report {
        /// Financial year ID to report on
        year_id: i32,
        /// Restrict the KPI summary to one sub-cluster
        #[arg(long)]
        sub_cluster_id: Option<i32>,
    },
}

/// Execute the `stakmap init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Next: run `stakmap db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `stakmap db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = StakmapConfig::resolve(cli_db_url);

    println!("Initializing stakmap database...");

    // 1. Create the database if it does not exist.
    pool::ensure_database_exists(&resolved.db_config).await?;

    // 2. Connect to the target database.
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    // 3. Run migrations.
    pool::run_migrations(&db_pool).await?;

    // 4. Print success with table counts.
    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    // 5. Clean shutdown.
    db_pool.close().await;

    println!("stakmap db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = StakmapConfig::resolve(cli.database_url.as_deref());
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = serve::run_serve(db_pool.clone(), &bind, port).await;
            db_pool.close().await;
            result?;
        }
        Commands::Report {
            year_id,
            sub_cluster_id,
        } => {
            let resolved = StakmapConfig::resolve(cli.database_url.as_deref());
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = report_cmd::run_report(&db_pool, year_id, sub_cluster_id).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
