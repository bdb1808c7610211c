//! sapphire-server - Sapphire Platform backend service
//!
//! REST API for tasks, subtasks, deadlines, help requests, and meeting
//! transcription, plus the background deadline-reminder job.

use anyhow::Result;
use clap::Parser;
use sapphire_common::config::{resolve_root_folder, Config, RootFolder};
use sapphire_common::db::init_database;
use sapphire_server::jobs::reminders::start_reminder_job;
use sapphire_server::services::mailer::Mailer;
use sapphire_server::{build_router, AppState};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "sapphire-server", about = "Sapphire Platform backend service")]
struct Args {
    /// Root folder holding the database, uploads, and sapphire.toml
    #[arg(long)]
    root_folder: Option<String>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting Sapphire Platform server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    let root = RootFolder::new(resolve_root_folder(args.root_folder.as_deref()));
    root.ensure_exists()?;
    info!("Root folder: {}", root.path().display());

    let mut config = Config::load(&root)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    let config = Arc::new(config);

    let db_path = root.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path).await?;

    let mailer = Arc::new(Mailer::from_config(&config.reminders)?);
    start_reminder_job(pool.clone(), config.reminders.clone(), mailer);

    let state = AppState::new(pool, config.clone(), root.uploads_dir())?;
    let app = build_router(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/api/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
