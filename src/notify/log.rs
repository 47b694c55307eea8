//! Dry-run notifier that writes alerts to the log.

use async_trait::async_trait;
use tracing::info;

use super::Notifier;
use crate::error::NotifyError;
use crate::monitor::SubscriberId;

/// Logs every alert under the `liquidation_alert` target and never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &SubscriberId, text: &str) -> Result<(), NotifyError> {
        info!(target: "liquidation_alert", recipient = %recipient, "\n{}", text);
        Ok(())
    }
}
