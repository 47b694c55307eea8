//! Liquidation Watch - Main Entry Point
//!
//! Runs the supervised monitoring loop, or answers one-shot status and
//! account queries for a wallet.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use liquidation_watch::alert::{render_account, render_status};
use liquidation_watch::config::{Config, LoggingConfig};
use liquidation_watch::exchange::HyperliquidClient;
use liquidation_watch::monitor::{
    MonitorService, RegistryLimits, Scheduler, SchedulerConfig, SubscriberId, SubscriptionRegistry,
};
use liquidation_watch::notify::build_notifier;
use liquidation_watch::risk::{CooldownTracker, RiskCalculator};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Liquidation Watch CLI
#[derive(Parser)]
#[command(name = "liquidation-watch")]
#[command(version, about = "Liquidation risk alerts for perpetuals wallets")]
struct Cli {
    /// Path to a configuration file (default: ./config.*)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitoring loop (default)
    Run,

    /// Show the current liquidation risk of a wallet
    Status {
        /// Wallet address
        wallet: String,

        /// Alert threshold (defaults to the configured default)
        #[arg(short, long)]
        threshold: Option<Decimal>,
    },

    /// Show trading statistics and PnL of a wallet
    Account {
        /// Wallet address
        wallet: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    config.validate()?;

    init_logging(&config.logging)?;

    match cli.command {
        Some(Commands::Status { wallet, threshold }) => {
            show_status(&config, &wallet, threshold).await
        }
        Some(Commands::Account { wallet }) => show_account(&config, &wallet).await,
        Some(Commands::Run) | None => run_monitor(config).await,
    }
}

/// Build the registry from configuration, including the seeded watch list.
async fn build_registry(config: &Config) -> Result<Arc<SubscriptionRegistry>> {
    let limits = RegistryLimits::from_config(&config.subscriptions, config.monitor.severity_basis);
    let registry = Arc::new(SubscriptionRegistry::new(limits));

    for entry in &config.subscriptions.watch {
        registry
            .subscribe(
                SubscriberId::from(entry.id.as_str()),
                &entry.wallet,
                entry.threshold,
                entry.interval_secs.map(Duration::from_secs),
            )
            .await
            .with_context(|| format!("Invalid watch entry for subscriber {}", entry.id))?;
    }

    Ok(registry)
}

fn build_service(config: &Config, registry: Arc<SubscriptionRegistry>) -> Result<MonitorService> {
    let source = Arc::new(HyperliquidClient::new(&config.source)?);
    Ok(MonitorService::new(
        registry,
        source,
        RiskCalculator::new(config.monitor.severity_basis),
    ))
}

async fn run_monitor(config: Config) -> Result<()> {
    info!("Liquidation Watch v{} starting", env!("CARGO_PKG_VERSION"));
    log_config(&config);

    let registry = build_registry(&config).await?;
    if registry.is_empty().await {
        warn!("No subscriptions configured; passes will be empty until subscribers are added");
    }

    let source = Arc::new(HyperliquidClient::new(&config.source)?);
    let notifier = build_notifier(&config.notifier)?;

    let scheduler = Arc::new(Scheduler::new(
        registry,
        source,
        notifier,
        Arc::new(CooldownTracker::new()),
        RiskCalculator::new(config.monitor.severity_basis),
        SchedulerConfig::from_config(&config.monitor, &config.source, &config.notifier),
    ));

    let supervisor = scheduler.spawn_supervised();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, stopping monitor");

    supervisor.abort();
    if let Err(e) = supervisor.await {
        if !e.is_cancelled() {
            error!(error = %e, "Monitor supervisor ended abnormally");
        }
    }

    Ok(())
}

async fn show_status(config: &Config, wallet: &str, threshold: Option<Decimal>) -> Result<()> {
    let registry = Arc::new(SubscriptionRegistry::new(RegistryLimits::from_config(
        &config.subscriptions,
        config.monitor.severity_basis,
    )));
    let threshold = threshold.unwrap_or(registry.limits().default_threshold);
    let service = build_service(config, registry)?;

    let report = service
        .status_for_wallet(wallet, threshold)
        .await
        .context("Failed to fetch wallet status")?;
    println!("{}", render_status(&report));
    Ok(())
}

async fn show_account(config: &Config, wallet: &str) -> Result<()> {
    let service = build_service(config, Arc::new(SubscriptionRegistry::default()))?;

    let overview = service
        .account_for_wallet(wallet)
        .await
        .context("Failed to fetch account overview")?;
    println!("{}", render_account(&overview));
    Ok(())
}

/// Initialize stdout plus hourly rolling file logging.
fn init_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all(&config.directory)?;

    let file_appender =
        tracing_appender::rolling::hourly(&config.directory, "liquidation-watch.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the program duration
    Box::leak(Box::new(_guard));

    let filter = EnvFilter::from_default_env()
        .add_directive("liquidation_watch=debug".parse()?)
        .add_directive(Level::INFO.into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE);

    if config.json {
        builder.json().init();
    } else {
        builder.with_ansi(true).init();
    }

    Ok(())
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    info!("Configuration:");
    info!("   Source: {} (dex: {:?})", config.source.base_url, config.source.dex);
    info!(
        "   Tick: {}s, max concurrent fetches: {}",
        config.monitor.tick_secs, config.monitor.max_concurrent_fetches
    );
    info!("   Severity basis: {}", config.monitor.severity_basis);
    info!(
        "   Default threshold: {}, default interval: {}s",
        config.subscriptions.default_threshold, config.subscriptions.default_interval_secs
    );
    info!("   Notifier: {:?}", config.notifier.kind);
    info!("   Watched wallets: {}", config.subscriptions.watch.len());
}
