//! Venue-agnostic position snapshot contract.
//!
//! The monitoring core only consumes this trait; adapters translate a venue's
//! wire format into [`AccountSnapshot`] and [`Fill`] records.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::error::SourceError;

/// Margin mode of a leveraged position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarginMode {
    Cross,
    Isolated,
}

impl fmt::Display for MarginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginMode::Cross => write!(f, "cross"),
            MarginMode::Isolated => write!(f, "isolated"),
        }
    }
}

/// Leverage applied to a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Leverage {
    pub value: Decimal,
    pub mode: MarginMode,
}

/// One open position as reported by the venue.
///
/// Numeric fields are optional because the venue data is not trusted: a
/// missing or non-numeric value is carried as `None` and rejected by the risk
/// calculator for this record only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositionRecord {
    /// Raw instrument id, possibly namespaced (e.g. "vntls:OPENAI")
    pub instrument: String,
    /// Signed size: positive = long, negative = short
    pub size: Option<Decimal>,
    pub entry_price: Option<Decimal>,
    /// USD notional, signed by side in some venues; used unsigned
    pub position_value: Option<Decimal>,
    /// Absent for some cross-margin positions
    pub liquidation_price: Option<Decimal>,
    pub leverage: Option<Leverage>,
    pub unrealized_pnl: Option<Decimal>,
}

/// Account-level margin summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountSummary {
    pub account_value: Decimal,
    pub total_margin_used: Decimal,
    pub total_notional: Decimal,
    pub total_raw_usd: Decimal,
}

/// Everything a source knows about one wallet at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountSnapshot {
    pub positions: Vec<PositionRecord>,
    pub account_summary: Option<AccountSummary>,
}

/// A historical fill, used for account statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub instrument: String,
    /// Realized PnL of the fill; zero for opening fills
    pub closed_pnl: Decimal,
}

/// Source of position snapshots for a wallet.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Fetch open positions and the account summary for a wallet.
    async fn fetch(&self, wallet_address: &str) -> Result<AccountSnapshot, SourceError>;

    /// Fetch the wallet's historical fills.
    async fn fetch_fills(&self, wallet_address: &str) -> Result<Vec<Fill>, SourceError>;
}
