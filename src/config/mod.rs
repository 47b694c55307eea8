//! Configuration management for the liquidation watcher.
//!
//! Loads settings from an optional TOML file and `LQW__*` environment variables.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::exchange::hyperliquid::TESTNET_API_URL;
use crate::risk::SeverityBasis;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Position data source
    #[serde(default)]
    pub source: SourceConfig,
    /// Polling loop settings
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Subscription defaults, limits and seeded watch list
    #[serde(default)]
    pub subscriptions: SubscriptionConfig,
    /// Alert delivery
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Info API base URL (the `/info` path is appended)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Builder DEX namespace; empty string queries the main perps DEX
    #[serde(default = "default_dex")]
    pub dex: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between the start of two polling passes
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Maximum wallets fetched in parallel within one pass
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    /// Metric the subscriber threshold applies to
    #[serde(default)]
    pub severity_basis: SeverityBasis,
    /// Initial delay before restarting a crashed polling loop
    #[serde(default = "default_restart_backoff")]
    pub restart_backoff_secs: u64,
    /// Upper bound for the restart delay
    #[serde(default = "default_max_restart_backoff")]
    pub max_restart_backoff_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Threshold used when a subscriber does not give one
    #[serde(default = "default_threshold")]
    pub default_threshold: Decimal,
    /// Alert interval used when a subscriber does not give one
    #[serde(default = "default_interval")]
    pub default_interval_secs: u64,
    /// Upper bound on percent thresholds
    #[serde(default = "default_max_percent_threshold")]
    pub max_percent_threshold: Decimal,
    /// Lower bound on alert intervals
    #[serde(default = "default_min_interval")]
    pub min_interval_secs: u64,
    /// Subscriptions registered at startup
    #[serde(default)]
    pub watch: Vec<WatchEntry>,
}

/// A subscription seeded from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEntry {
    /// Subscriber id (also the notification recipient, e.g. a Telegram chat id)
    pub id: String,
    pub wallet: String,
    #[serde(default)]
    pub threshold: Option<Decimal>,
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// Write alerts to the log only
    #[default]
    Log,
    /// Deliver alerts through the Telegram Bot API
    Telegram,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub kind: NotifierKind,
    /// Bot token from BotFather
    #[serde(default)]
    pub telegram_bot_token: String,
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,
    /// Per-delivery timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for hourly rolling log files
    #[serde(default = "default_log_directory")]
    pub directory: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_base_url() -> String {
    TESTNET_API_URL.to_string()
}

fn default_dex() -> String {
    "vntls".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_tick_secs() -> u64 {
    30
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_restart_backoff() -> u64 {
    5
}

fn default_max_restart_backoff() -> u64 {
    300
}

fn default_threshold() -> Decimal {
    Decimal::new(50, 1) // 5.0
}

fn default_interval() -> u64 {
    300 // 5 minutes between repeat alerts
}

fn default_max_percent_threshold() -> Decimal {
    Decimal::new(50, 0)
}

fn default_min_interval() -> u64 {
    60
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_log_directory() -> String {
    "logs".to_string()
}

impl Config {
    /// Load configuration from environment variables and config files.
    ///
    /// `path` overrides the default `config` file lookup in the working directory.
    pub fn load(path: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(p) => config::File::with_name(p).required(true),
            None => config::File::with_name("config").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::default().separator("__").prefix("LQW"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.monitor.tick_secs > 0, "tick_secs must be positive");

        anyhow::ensure!(
            self.monitor.max_concurrent_fetches > 0,
            "max_concurrent_fetches must be positive"
        );

        anyhow::ensure!(
            self.monitor.restart_backoff_secs > 0
                && self.monitor.restart_backoff_secs <= self.monitor.max_restart_backoff_secs,
            "restart_backoff_secs must be positive and <= max_restart_backoff_secs"
        );

        anyhow::ensure!(
            self.source.request_timeout_secs > 0 && self.notifier.timeout_secs > 0,
            "request timeouts must be positive"
        );

        anyhow::ensure!(
            self.subscriptions.default_threshold > Decimal::ZERO,
            "default_threshold must be positive"
        );

        anyhow::ensure!(
            self.subscriptions.default_interval_secs >= self.subscriptions.min_interval_secs,
            "default_interval_secs must be >= min_interval_secs"
        );

        if self.notifier.kind == NotifierKind::Telegram {
            anyhow::ensure!(
                !self.notifier.telegram_bot_token.is_empty(),
                "telegram notifier requires telegram_bot_token"
            );
        }

        let max_threshold = self
            .monitor
            .severity_basis
            .max_threshold(self.subscriptions.max_percent_threshold);

        for entry in &self.subscriptions.watch {
            anyhow::ensure!(
                !entry.id.is_empty() && !entry.wallet.is_empty(),
                "watch entries need both id and wallet"
            );

            if let Some(threshold) = entry.threshold {
                anyhow::ensure!(
                    threshold > Decimal::ZERO && max_threshold.map_or(true, |max| threshold <= max),
                    "watch entry {}: threshold {} is out of range",
                    entry.id,
                    threshold
                );
            }

            if let Some(interval) = entry.interval_secs {
                anyhow::ensure!(
                    interval >= self.subscriptions.min_interval_secs,
                    "watch entry {}: interval_secs must be >= {}",
                    entry.id,
                    self.subscriptions.min_interval_secs
                );
            }
        }

        Ok(())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            dex: default_dex(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            severity_basis: SeverityBasis::default(),
            restart_backoff_secs: default_restart_backoff(),
            max_restart_backoff_secs: default_max_restart_backoff(),
        }
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            default_interval_secs: default_interval(),
            max_percent_threshold: default_max_percent_threshold(),
            min_interval_secs: default_min_interval(),
            watch: Vec::new(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::default(),
            telegram_bot_token: String::new(),
            telegram_api_url: default_telegram_api_url(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            json: false,
        }
    }
}
