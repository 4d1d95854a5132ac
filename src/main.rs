use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use backupman::config::Config;
use backupman::db;
use backupman::routes;
use backupman::services::backup::run_backup;
use backupman::services::health::health_report;
use backupman::services::retry::retry_backup;
use backupman::services::scheduler::BackupScheduler;
use backupman::state::{AppState, RunMode};

#[derive(Parser)]
#[command(name = "backupman")]
#[command(about = "Database backup orchestration with multi-drive fan-out", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "./backupman.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backup cycle for every configured data source
    Run,

    /// Retry the failed uploads of a failed backup
    Retry {
        /// Id of the backup to retry
        backup_id: String,
    },

    /// Check the health of every configured collaborator
    Health,

    /// Start the HTTP server and cron scheduler
    Serve {
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    let state = Arc::new(
        AppState::from_config(config)
            .await
            .context("failed to build application")?,
    );

    match cli.command {
        Commands::Run => {
            let backup_ids = run_backup(&state, RunMode::Interactive).await?;
            info!(?backup_ids, "backups created");
        }
        Commands::Retry { backup_id } => {
            retry_backup(&state, &backup_id, RunMode::Interactive).await?;
            info!(backup_id = %backup_id, "backup retry completed");
        }
        Commands::Health => {
            let report = health_report(&state).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_up() {
                std::process::exit(1);
            }
        }
        Commands::Serve { port } => serve(state, port).await?,
    }

    Ok(())
}

async fn serve(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let scheduler = BackupScheduler::new(state.clone()).await?;
    if let Err(e) = scheduler.init().await {
        warn!(error = %e, "failed to initialize backup schedule");
    }
    if let Err(e) = scheduler.start().await {
        warn!(error = %e, "failed to start scheduler");
    }

    let app = routes::create_router(state.clone());

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down...");
    if let Err(e) = scheduler.shutdown().await {
        warn!(error = %e, "scheduler shutdown error");
    }

    // Detached cleanup/notification/retention tasks are best-effort, but they
    // must not be dropped on the floor at exit: drain them before closing.
    state.tasks.close();
    state.tasks.wait().await;

    db::connection::close_pool(&state.db);
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
