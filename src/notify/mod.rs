//! Alert delivery.
//!
//! The scheduler only sees the [`Notifier`] trait; the concrete transport is
//! chosen by configuration.

mod log;
mod telegram;

pub use self::log::LogNotifier;
pub use self::telegram::TelegramNotifier;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{NotifierConfig, NotifierKind};
use crate::error::NotifyError;
use crate::monitor::SubscriberId;

/// Delivers rendered text to a subscriber.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &SubscriberId, text: &str) -> Result<(), NotifyError>;
}

/// Build the notifier selected in configuration.
pub fn build_notifier(config: &NotifierConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match config.kind {
        NotifierKind::Log => Arc::new(LogNotifier),
        NotifierKind::Telegram => Arc::new(TelegramNotifier::new(config)?),
    };
    Ok(notifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_log_notifier() {
        let notifier = build_notifier(&NotifierConfig::default()).unwrap();
        assert!(notifier.send(&SubscriberId::from(1), "hello").await.is_ok());
    }
}
