//! Database Backup/Restore Tool
//!
//! Dumps MySQL or PostgreSQL databases with the vendor clients, optionally
//! compresses, encrypts and uploads the result, and can repeat the backup on
//! a schedule.

// dbbackup/src/main.rs
mod backup;
mod cli;
mod config;
mod errors;
mod logging;
mod restore;
mod schedule;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands, ScheduleArgs};
use config::BackupJob;
use logging::{DEFAULT_LOG_FILE, LogSession};

/// Main entry point for the backup/restore tool
#[tokio::main]
async fn main() -> ExitCode {
    // Lets AWS credentials and the like live in a local .env file.
    dotenv::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let Some(message) = cli::parse_failure(&e) else {
                let _ = e.print();
                return ExitCode::SUCCESS;
            };
            print!("{message}");
            // The log options were never parsed, so the default log gets the entry.
            if let Ok(_log) = LogSession::open(Path::new(DEFAULT_LOG_FILE), "info") {
                let summary = message.lines().next().unwrap_or_default();
                tracing::error!(error = %summary, "Invalid command line");
            }
            return ExitCode::from(1);
        }
    };

    // Held until main returns so buffered log lines are flushed.
    let log = match LogSession::open(&cli.log_file, &cli.log_level) {
        Ok(session) => session,
        Err(e) => {
            println!("❌ Error: {e}");
            return ExitCode::from(1);
        }
    };
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %log.path().display(),
        "dbbackup started"
    );

    match run_app(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("❌ Error: {e:#}");
            tracing::error!(error = %format!("{e:#}"), "Command failed");
            ExitCode::from(1)
        }
    }
}

async fn run_app(command: Commands) -> Result<()> {
    match command {
        Commands::Backup(args) => {
            let job = args.job().context("Invalid backup configuration")?;
            println!("🚀 Starting Backup Process...");
            let report = backup::run_backup_flow(&job)
                .await
                .context("Backup process failed")?;
            if let Some(key) = report.uploaded_key {
                println!("✅ Backup stored as {} and uploaded as {key}", report.final_path.display());
            } else {
                println!("✅ Backup stored as {}", report.final_path.display());
            }
        }
        Commands::Restore(args) => {
            let job = args.job().context("Invalid restore configuration")?;
            println!("🔄 Starting Restore Process...");
            restore::run_restore_flow(&job).context("Restore process failed")?;
            println!("✅ Restore completed.");
        }
        Commands::Schedule(args) => run_scheduled_backups(&args).await?,
        Commands::Version => {
            println!("dbbackup version {}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}

async fn run_scheduled_backups(args: &ScheduleArgs) -> Result<()> {
    let schedule = args.schedule().context("Invalid schedule")?;
    // Refuse to start on a config that can never produce a backup.
    BackupJob::from_config_file(&args.config).context("Invalid backup configuration")?;

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        println!("\n⚠️  Shutdown signal received, stopping after the current backup...");
        token.cancel();
    });

    println!("⏰ Starting scheduled backups ({schedule}) from {}", args.config.display());
    let config_path = args.config.clone();
    schedule::run_schedule(schedule, cancel, || {
        let config_path = config_path.clone();
        async move {
            // Re-read on every run so edits apply without a restart.
            let job = BackupJob::from_config_file(&config_path)
                .context("Invalid backup configuration")?;
            backup::run_backup_flow(&job).await?;
            Ok(())
        }
    })
    .await;
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT (Ctrl+C), shutting down"),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received SIGINT (Ctrl+C), shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
