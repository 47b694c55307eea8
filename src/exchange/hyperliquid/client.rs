//! Hyperliquid REST API client.
//!
//! Read-only access to per-wallet account data on the `/info` endpoint:
//! - Clearinghouse state (open positions, margin summary)
//! - User fills (trade history)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use super::types::*;
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::exchange::{AccountSnapshot, Fill, PositionSource};

/// Base URL for the Hyperliquid testnet API.
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";

/// Hyperliquid API client for fetching account state.
#[derive(Debug, Clone)]
pub struct HyperliquidClient {
    client: Client,
    base_url: String,
    dex: Option<String>,
}

impl HyperliquidClient {
    /// Create a new client from configuration.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let dex = Some(config.dex.trim().to_string()).filter(|d| !d.is_empty());

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dex,
        })
    }

    /// Builder DEX namespace sent with every request, if any.
    pub fn dex(&self) -> Option<&str> {
        self.dex.as_deref()
    }

    async fn post_info<T: DeserializeOwned>(&self, request: &InfoRequest) -> Result<T> {
        let url = format!("{}/info", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to send info request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Hyperliquid API error {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse info response")
    }

    /// Get open positions and margin summary for a wallet.
    #[instrument(skip(self), name = "hl_clearinghouse_state")]
    pub async fn get_clearinghouse_state(&self, wallet_address: &str) -> Result<AccountSnapshot> {
        let request = InfoRequest::ClearinghouseState {
            user: wallet_address.to_string(),
            dex: self.dex.clone(),
        };

        // A null body means the venue has never seen this wallet.
        let state: Option<ClearinghouseState> = self.post_info(&request).await?;
        let state = state.unwrap_or_default();

        let positions: Vec<_> = state
            .asset_positions
            .into_iter()
            .map(decode_position)
            .collect();

        debug!("Fetched {} positions for {}", positions.len(), wallet_address);

        Ok(AccountSnapshot {
            positions,
            account_summary: state.margin_summary.map(Into::into),
        })
    }

    /// Get historical fills for a wallet.
    #[instrument(skip(self), name = "hl_user_fills")]
    pub async fn get_user_fills(&self, wallet_address: &str) -> Result<Vec<Fill>> {
        let request = InfoRequest::UserFills {
            user: wallet_address.to_string(),
            dex: self.dex.clone(),
        };

        let fills: Option<Vec<Value>> = self.post_info(&request).await?;
        let fills: Vec<Fill> = fills
            .unwrap_or_default()
            .into_iter()
            .filter_map(decode_fill)
            .collect();

        debug!("Fetched {} fills for {}", fills.len(), wallet_address);
        Ok(fills)
    }
}

#[async_trait]
impl PositionSource for HyperliquidClient {
    async fn fetch(&self, wallet_address: &str) -> Result<AccountSnapshot, SourceError> {
        self.get_clearinghouse_state(wallet_address)
            .await
            .map_err(|e| SourceError::fetch_failed(wallet_address, format!("{:#}", e)))
    }

    async fn fetch_fills(&self, wallet_address: &str) -> Result<Vec<Fill>, SourceError> {
        self.get_user_fills(wallet_address)
            .await
            .map_err(|e| SourceError::fetch_failed(wallet_address, format!("{:#}", e)))
    }
}
