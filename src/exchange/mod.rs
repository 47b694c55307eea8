//! Exchange integrations for position monitoring.
//!
//! ## Contract
//! [`PositionSource`] is the only thing the monitoring core depends on:
//! given a wallet address it yields open positions, an optional account
//! summary, and on demand the wallet's fills.
//!
//! ## Hyperliquid
//! Read-only `/info` access for:
//! - Clearinghouse state (positions, margin summary)
//! - User fills (trading statistics)

pub mod hyperliquid;
mod traits;

pub use hyperliquid::HyperliquidClient;
pub use traits::*;
