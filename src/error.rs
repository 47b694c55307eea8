//! Error taxonomy for the monitoring core.
//!
//! Registry mutations surface their validation errors synchronously to the
//! caller. Everything raised inside a polling pass (malformed positions,
//! failed fetches, failed deliveries) is logged and skipped by the scheduler.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::monitor::SubscriberId;

/// Validation failures from subscription registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("subscriber {0} is not subscribed")]
    NotSubscribed(SubscriberId),

    #[error("invalid alert threshold {value}: {reason}")]
    InvalidThreshold { value: Decimal, reason: String },

    #[error("invalid alert interval {secs}s: must be at least {min_secs}s")]
    InvalidInterval { secs: u64, min_secs: u64 },
}

/// Per-record failure raised by the risk calculator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskError {
    #[error("malformed position {instrument:?}: {reason}")]
    MalformedPosition { instrument: String, reason: String },
}

impl RiskError {
    pub(crate) fn malformed(instrument: &str, reason: impl Into<String>) -> Self {
        RiskError::MalformedPosition {
            instrument: instrument.to_string(),
            reason: reason.into(),
        }
    }
}

/// Per-subscription failure raised by a position snapshot source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("fetch failed for wallet {wallet}: {reason}")]
    FetchFailed { wallet: String, reason: String },
}

impl SourceError {
    pub(crate) fn fetch_failed(wallet: &str, reason: impl std::fmt::Display) -> Self {
        SourceError::FetchFailed {
            wallet: wallet.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Per-alert failure raised by a notifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("delivery to {recipient} failed: {reason}")]
    DeliveryFailed { recipient: String, reason: String },
}

impl NotifyError {
    pub(crate) fn delivery_failed(
        recipient: &SubscriberId,
        reason: impl std::fmt::Display,
    ) -> Self {
        NotifyError::DeliveryFailed {
            recipient: recipient.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors returned to the command layer by [`crate::monitor::MonitorService`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl ServiceError {
    /// Text safe to show to an end user.
    ///
    /// Validation errors explain what to change; data-source failures never
    /// leak internal details.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Registry(RegistryError::NotSubscribed(_)) => {
                "You're not being monitored. Subscribe with a wallet address first.".to_string()
            }
            ServiceError::Registry(RegistryError::InvalidThreshold { reason, .. }) => {
                format!("Invalid threshold: {}. Please try again.", reason)
            }
            ServiceError::Registry(RegistryError::InvalidInterval { min_secs, .. }) => format!(
                "Alert interval must be at least {} seconds. Please try again.",
                min_secs
            ),
            ServiceError::Source(_) => {
                "Unable to fetch account data right now. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_user_message_hides_fetch_details() {
        let err: ServiceError =
            SourceError::fetch_failed("0xabc", "connection reset by peer").into();
        let msg = err.user_message();
        assert!(msg.contains("try again"));
        assert!(!msg.contains("connection reset"));
        assert!(!msg.contains("0xabc"));
    }

    #[test]
    fn test_user_message_for_validation() {
        let err: ServiceError = RegistryError::InvalidThreshold {
            value: dec!(75),
            reason: "must be at most 50".to_string(),
        }
        .into();
        assert!(err.user_message().contains("must be at most 50"));

        let err: ServiceError = RegistryError::InvalidInterval { secs: 10, min_secs: 60 }.into();
        assert!(err.user_message().contains("60 seconds"));
    }
}
