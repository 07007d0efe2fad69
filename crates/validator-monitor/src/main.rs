//! Validator monitor CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use notify::{Notifier, NotifyChannel, TelegramChannel};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use validator_monitor::clients::{DashboardClient, ExplorerClient, HttpClient, NodeClient};
use validator_monitor::config::{RequestsConfig, TelegramConfig};
use validator_monitor::{
    logging, AccountRegistry, AlertPolicy, CycleRunner, Evaluator, RetryPolicy, Settings,
};

/// Validator monitor - checks node sync, dashboard stats and attestation
/// performance, writes CSV reports and sends Telegram alerts.
#[derive(Parser)]
#[command(name = "validator-monitor")]
#[command(about = "Validator health monitor")]
#[command(version)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(
        short,
        long,
        env = "VALIDATOR_MONITOR_CONFIG",
        default_value = "user_data/config.yaml"
    )]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    let _log_guard = logging::init(&settings.logging, cli.verbose);

    let monitoring = &settings.monitoring;
    let registry = AccountRegistry::load(&monitoring.accounts_file)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        accounts = registry.len(),
        threads = monitoring.threads,
        "Starting validator monitor"
    );

    let http = HttpClient::new(&monitoring.requests, &monitoring.proxy)
        .context("failed to build HTTP client")?;
    let node = Arc::new(NodeClient::new(http.clone()));
    let dashboard = Arc::new(DashboardClient::new(http.clone(), &monitoring.api));
    let explorer = Arc::new(ExplorerClient::new(http, &monitoring.explorer));

    let evaluator = Evaluator::new(
        node,
        dashboard,
        RetryPolicy::from_config(&monitoring.requests),
        monitoring.attestation_success_threshold,
    );
    let notifier = build_notifier(&settings.telegram, &monitoring.requests)?;
    let alerts = AlertPolicy::new(notifier, monitoring.links.clone());

    let runner = CycleRunner::new(
        registry.shared(),
        explorer,
        Arc::new(evaluator),
        Arc::new(alerts),
        monitoring,
    );

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, finishing current cycle");
        trigger.cancel();
    });

    let stats = runner.run_forever(shutdown).await;
    info!(
        completed = stats.completed,
        failed = stats.failed,
        "Validator monitor stopped"
    );

    Ok(())
}

fn build_notifier(telegram: &TelegramConfig, requests: &RequestsConfig) -> Result<Notifier> {
    if !telegram.enabled {
        info!("Telegram notifications disabled");
        return Ok(Notifier::disabled());
    }

    let client = reqwest::Client::builder()
        .timeout(requests.timeout())
        .build()
        .context("failed to build Telegram HTTP client")?;
    let channel = TelegramChannel::new(&telegram.bot_api_token, &telegram.chat_id)
        .with_thread_id(telegram.thread_id)
        .with_client(client);

    Ok(Notifier::with_channels(vec![
        Arc::new(channel) as Arc<dyn NotifyChannel>
    ]))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
