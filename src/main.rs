//! RosterKit - Sports Roster and Athlete Statistics Manager
//!
//! Main entry point: runs an administrative command, or serves the web app.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rosterkit::cli::{self, Cli, Command};
use rosterkit::storage::config::load_config;
use rosterkit::{build_router, AppState, Database, StatisticRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let command = Cli::parse().into_command();

    let config = load_config().context("failed to load configuration")?;
    let db_path = config.database_path();
    let mut db = Database::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    if command != Command::Serve {
        let id = cli::execute(&mut db, &command)?;
        println!("{}", id);
        return Ok(());
    }

    tracing::info!("Starting RosterKit v{}", env!("CARGO_PKG_VERSION"));

    if config.stats.seed_universal_statistics {
        let seeded = StatisticRegistry::new(db.connection()).seed_universal()?;
        tracing::info!(count = seeded, "Universal statistics ready");
    }

    let bind = config.server.bind.clone();
    let app = build_router(AppState::new(db, config));
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    tracing::info!(address = %bind, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
