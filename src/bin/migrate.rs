use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use oms_api::{
    config,
    db::{self, DbConfig},
    migrator::Migrator,
};

/// Schema management for the order store.
#[derive(Parser)]
#[command(name = "migrate", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Database URL; defaults to the configured database_url"
    )]
    database_url: Option<String>,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Emit logs as JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every pending migration
    Up,
    /// Roll back the most recent migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// List migrations and whether they are applied
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_tracing("info", cli.json);

    let url = match cli.database_url {
        Some(url) => url,
        None => {
            config::load_config()
                .context("no --database-url given and configuration could not be loaded")?
                .database_url
        }
    };

    let db_config = DbConfig {
        url,
        max_connections: 1,
        ..Default::default()
    };
    let pool = db::establish_connection_with_config(&db_config).await?;

    match cli.command {
        Commands::Up => {
            Migrator::up(&pool, None).await?;
            info!("All migrations applied");
        }
        Commands::Down { steps } => {
            Migrator::down(&pool, Some(steps)).await?;
            info!(steps, "Rolled back migrations");
        }
        Commands::Status => {
            for migration in Migrator::get_migration_with_status(&pool).await? {
                println!("{:<48} {:?}", migration.name(), migration.status());
            }
        }
        Commands::Fresh => {
            Migrator::fresh(&pool).await?;
            info!("Schema recreated");
        }
    }

    db::close_pool(pool).await?;
    Ok(())
}
