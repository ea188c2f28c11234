use std::error::Error;

use chrono::Duration;
use clap::Parser;
use loginflow::{LOGIN_FLOW_LIFETIME_SECS, LoginFlowsBuilder};
use tracing_subscriber::EnvFilter;

/// Command line interface for loginflow
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "LOGINFLOW_DATABASE_URL")]
    database_url: String,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Delete every login flow older than the lifetime
    Cleanup {
        /// Lifetime in seconds
        #[arg(long, default_value_t = LOGIN_FLOW_LIFETIME_SECS)]
        lifetime_secs: i64,
    },
    /// Check that the database is reachable
    Check,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Migrate => {
            tracing::info!("Running migrations");
            LoginFlowsBuilder::new()
                .with_sqlite(&cli.database_url)
                .await?
                .apply_migrations(true)
                .build()
                .await?;
            tracing::info!("Migrations complete");
        }
        Commands::Cleanup { lifetime_secs } => {
            let lifetime = Duration::try_seconds(lifetime_secs)
                .ok_or_else(|| format!("lifetime of {lifetime_secs}s is out of range"))?;

            let flows = LoginFlowsBuilder::new()
                .with_sqlite(&cli.database_url)
                .await?
                .with_lifetime(lifetime)
                .build()
                .await?;
            tracing::info!(lifetime_secs, "Sweeping expired login flows");
            flows.cleanup().await?;
        }
        Commands::Check => {
            let flows = LoginFlowsBuilder::new()
                .with_sqlite(&cli.database_url)
                .await?
                .build()
                .await?;
            flows.health_check().await?;
            tracing::info!("Database is reachable");
        }
        Commands::Version => {
            println!("loginflow v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
