//! Telegram Bot API notifier.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::Notifier;
use crate::config::NotifierConfig;
use crate::error::NotifyError;
use crate::monitor::SubscriberId;

/// Sends alerts with `sendMessage`; the subscriber id is the chat id.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    send_url: String,
}

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: &NotifierConfig) -> Result<Self> {
        anyhow::ensure!(
            !config.telegram_bot_token.is_empty(),
            "Telegram bot token is not configured"
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let send_url = format!(
            "{}/bot{}/sendMessage",
            config.telegram_api_url.trim_end_matches('/'),
            config.telegram_bot_token
        );

        Ok(Self { client, send_url })
    }
}

// The URL embeds the bot token, keep it out of debug output.
impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier").finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip(self, text), name = "telegram_send")]
    async fn send(&self, recipient: &SubscriberId, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.send_url)
            .json(&serde_json::json!({
                "chat_id": recipient.as_str(),
                "text": text,
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            .map_err(|e| NotifyError::delivery_failed(recipient, e.without_url()))?;

        let status = response.status();
        let body: BotResponse = response.json().await.map_err(|e| {
            NotifyError::delivery_failed(recipient, format!("HTTP {}: {}", status, e.without_url()))
        })?;

        if !status.is_success() || !body.ok {
            return Err(NotifyError::delivery_failed(
                recipient,
                format!(
                    "HTTP {}: {}",
                    status,
                    body.description.unwrap_or_else(|| "unknown error".to_string())
                ),
            ));
        }

        debug!(recipient = %recipient, "Telegram message delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier_for(server: &MockServer) -> TelegramNotifier {
        TelegramNotifier::new(&NotifierConfig {
            telegram_bot_token: "123:secret".to_string(),
            telegram_api_url: server.uri(),
            ..NotifierConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_posts_to_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:secret/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": "4242",
                "text": "hello"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"message_id": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = notifier_for(&server);
        notifier.send(&SubscriberId::from(4242), "hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_api_error_is_delivery_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            })))
            .mount(&server)
            .await;

        let notifier = notifier_for(&server);
        let err = notifier.send(&SubscriberId::from(1), "hi").await.unwrap_err();
        match err {
            NotifyError::DeliveryFailed { recipient, reason } => {
                assert_eq!(recipient, "1");
                assert!(reason.contains("blocked"));
                assert!(!reason.contains("secret"));
            }
        }
    }

    #[test]
    fn test_requires_token() {
        assert!(TelegramNotifier::new(&NotifierConfig::default()).is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let notifier = TelegramNotifier::new(&NotifierConfig {
            telegram_bot_token: "123:secret".to_string(),
            ..NotifierConfig::default()
        })
        .unwrap();
        assert!(!format!("{:?}", notifier).contains("secret"));
    }
}
