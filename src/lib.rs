//! # Liquidation Watch
//!
//! Periodically polls the perpetuals positions of subscribed wallets and
//! alerts subscribers whose positions are close to liquidation.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `exchange`: Position source contract and the Hyperliquid `/info` adapter
//! - `risk`: Liquidation distance, severity tiering and alert cooldowns
//! - `monitor`: Subscription registry, polling scheduler and command facade
//! - `notify`: Alert delivery (log, Telegram)
//! - `alert`: Plain-text rendering of alerts and reports
//! - `utils`: Shared utilities and decimal arithmetic

pub mod alert;
pub mod config;
pub mod error;
pub mod exchange;
pub mod monitor;
pub mod notify;
pub mod risk;
pub mod utils;

pub use config::Config;
