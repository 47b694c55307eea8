//! Subscription registry, polling scheduler and command-layer facade.
//!
//! Data flow of one pass:
//! registry snapshot -> position source -> risk calculator -> cooldown -> notifier

mod registry;
mod scheduler;
mod service;
mod stats;

pub use registry::{RegistryLimits, SubscriptionRegistry};
pub use scheduler::{PassSummary, Scheduler, SchedulerConfig};
pub use service::{AccountOverview, MonitorService, PositionStatus, StatusReport};
pub use stats::FillStats;

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Opaque subscriber identifier (chat id, user id, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for SubscriberId {
    fn from(id: i64) -> Self {
        SubscriberId(id.to_string())
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        SubscriberId(id.to_string())
    }
}

impl From<String> for SubscriberId {
    fn from(id: String) -> Self {
        SubscriberId(id)
    }
}

/// One subscriber's monitoring settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub subscriber_id: SubscriberId,
    /// Venue account; format is not validated
    pub wallet_address: String,
    /// Percent of liquidation price, or USD on the dollar basis
    pub alert_threshold: Decimal,
    /// Minimum time between repeat alerts for one position
    pub alert_interval: Duration,
}
