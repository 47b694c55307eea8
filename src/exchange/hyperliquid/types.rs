//! Type definitions for Hyperliquid `/info` requests and responses.
//!
//! Position payloads are decoded leniently: a record with a missing or
//! non-numeric field still decodes, with that field set to `None`, so one bad
//! record never poisons the rest of the account.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::exchange::{AccountSummary, Fill, Leverage, MarginMode, PositionRecord};

/// Request type for the Hyperliquid info endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum InfoRequest {
    /// Open positions and margin summary for a user.
    #[serde(rename = "clearinghouseState")]
    ClearinghouseState {
        user: String,
        /// Builder DEX namespace (e.g. "vntls"); omitted for the main perps DEX
        #[serde(skip_serializing_if = "Option::is_none")]
        dex: Option<String>,
    },

    /// Historical fills for a user.
    #[serde(rename = "userFills")]
    UserFills {
        user: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        dex: Option<String>,
    },
}

/// Response from the clearinghouseState endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearinghouseState {
    /// Kept as raw values so each entry decodes independently
    #[serde(default)]
    pub asset_positions: Vec<Value>,
    #[serde(default)]
    pub margin_summary: Option<MarginSummary>,
}

/// Wrapper around one position entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetPosition {
    pub position: RawPosition,
}

/// Position fields as sent by the venue.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPosition {
    #[serde(default)]
    pub coin: Option<String>,
    /// Signed size
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub szi: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub entry_px: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub position_value: Option<Decimal>,
    /// Null for cross positions without a discrete liquidation price
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub liquidation_px: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub unrealized_pnl: Option<Decimal>,
    #[serde(default)]
    pub leverage: Option<RawLeverage>,
}

/// Leverage as sent by the venue: `{"type": "cross", "value": 5}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLeverage {
    #[serde(rename = "type", default)]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub value: Option<Decimal>,
}

/// Account margin summary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub account_value: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub total_margin_used: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub total_ntl_pos: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub total_raw_usd: Option<Decimal>,
}

/// One entry of the userFills response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFill {
    #[serde(default)]
    pub coin: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub closed_pnl: Option<Decimal>,
}

impl From<RawPosition> for PositionRecord {
    fn from(raw: RawPosition) -> Self {
        let leverage = raw.leverage.and_then(|lev| {
            let mode = match lev.mode.as_deref() {
                Some("isolated") => MarginMode::Isolated,
                _ => MarginMode::Cross,
            };
            lev.value.map(|value| Leverage { value, mode })
        });

        PositionRecord {
            instrument: raw.coin.unwrap_or_default(),
            size: raw.szi,
            entry_price: raw.entry_px,
            position_value: raw.position_value,
            liquidation_price: raw.liquidation_px,
            leverage,
            unrealized_pnl: raw.unrealized_pnl,
        }
    }
}

impl From<MarginSummary> for AccountSummary {
    fn from(summary: MarginSummary) -> Self {
        AccountSummary {
            account_value: summary.account_value.unwrap_or_default(),
            total_margin_used: summary.total_margin_used.unwrap_or_default(),
            total_notional: summary.total_ntl_pos.unwrap_or_default(),
            total_raw_usd: summary.total_raw_usd.unwrap_or_default(),
        }
    }
}

impl From<RawFill> for Fill {
    fn from(raw: RawFill) -> Self {
        Fill {
            instrument: raw.coin.unwrap_or_default(),
            closed_pnl: raw.closed_pnl.unwrap_or_default(),
        }
    }
}

/// Decode one asset position entry.
///
/// Entries that are not even shaped like a position become an empty record,
/// which the risk calculator rejects as malformed.
pub fn decode_position(value: Value) -> PositionRecord {
    serde_json::from_value::<AssetPosition>(value)
        .map(|entry| entry.position.into())
        .unwrap_or_default()
}

/// Decode one fill entry, dropping entries that are not objects.
pub fn decode_fill(value: Value) -> Option<Fill> {
    serde_json::from_value::<RawFill>(value).ok().map(Fill::from)
}

// Hyperliquid encodes decimals as strings but leverage as a bare number.
// Null, missing and unparseable values all decode to None.
fn deserialize_lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => parse_decimal(s.trim()),
        Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    })
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    s.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}
