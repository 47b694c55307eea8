//! Hyperliquid exchange integration.
//!
//! Provides read-only access to wallet account state on Hyperliquid and its
//! builder-deployed perp DEXs (selected with the `dex` request field).
//!
//! # Liquidation Price Notes
//!
//! `liquidationPx` is `null` for cross-margin positions whose liquidation
//! depends on account-wide equity. The risk calculator synthesizes an
//! isolated-style estimate from leverage in that case.

mod client;
mod types;

pub use client::{HyperliquidClient, TESTNET_API_URL};
pub use types::*;
