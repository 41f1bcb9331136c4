//! AI Guardrails terminal console

mod cli;
mod commands;
mod render;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use guardrails_console_core::{ConsoleConfig, Session};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "guardrails=info,guardrails_console_core=info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = ConsoleConfig::load(cli.config.as_deref())?;
    let session = Session::open(config)?;
    info!(
        base_url = %session.config().base_url,
        authenticated = session.is_authenticated(),
        "console ready"
    );

    match &cli.command {
        Command::Register(args) => commands::register(&session, args).await,
        Command::Login(args) => commands::login(&session, args).await,
        Command::Logout => commands::logout(&session),
        Command::Scan(args) => commands::scan(&session, args, cli.output).await,
        Command::Audit { page } => commands::audit(&session, *page, cli.output).await,
        Command::Stats => commands::stats(&session, cli.output).await,
        Command::Clear => commands::clear(&session).await,
        Command::Watch => commands::watch(&session, cli.output).await,
    }
}

/// Logs go to stderr; stdout carries command output.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
