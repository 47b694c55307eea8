//! Repeat-alert suppression per (subscriber, instrument).

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::monitor::SubscriberId;

/// Key for cooldown entries: one per position of each subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CooldownKey {
    pub subscriber: SubscriberId,
    pub instrument: String,
}

impl CooldownKey {
    pub fn new(subscriber: &SubscriberId, instrument: &str) -> Self {
        Self {
            subscriber: subscriber.clone(),
            instrument: instrument.to_string(),
        }
    }
}

/// Records the last alert time per key and gates new alerts.
///
/// Entries never expire; they are only overwritten by a newer alert.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_alerts: Mutex<HashMap<CooldownKey, DateTime<Utc>>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether an alert may fire now, recording it if so.
    ///
    /// Returns true (and stores `now`) when no alert was recorded for the key
    /// or at least `interval` has elapsed since the last one. The check and
    /// the record happen under one lock, so overlapping passes cannot both
    /// win for the same key.
    pub async fn should_alert(
        &self,
        subscriber: &SubscriberId,
        instrument: &str,
        now: DateTime<Utc>,
        interval: Duration,
    ) -> bool {
        let key = CooldownKey::new(subscriber, instrument);
        let mut last_alerts = self.last_alerts.lock().await;

        if let Some(last) = last_alerts.get(&key) {
            // A negative elapsed time (clock went backwards) never clears the cooldown
            let elapsed_ok = now
                .signed_duration_since(*last)
                .to_std()
                .map(|elapsed| elapsed >= interval)
                .unwrap_or(false);

            if !elapsed_ok {
                debug!(
                    subscriber = %subscriber,
                    instrument = %instrument,
                    last_alert = %last,
                    "Cooldown active"
                );
                return false;
            }
        }

        last_alerts.insert(key, now);
        true
    }

    /// Last recorded alert time for a key.
    pub async fn last_alert(
        &self,
        subscriber: &SubscriberId,
        instrument: &str,
    ) -> Option<DateTime<Utc>> {
        self.last_alerts
            .lock()
            .await
            .get(&CooldownKey::new(subscriber, instrument))
            .copied()
    }

    /// Number of tracked keys.
    pub async fn len(&self) -> usize {
        self.last_alerts.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_cooldown_sequence() {
        let tracker = CooldownTracker::new();
        let id = SubscriberId::from(42);
        let interval = Duration::from_secs(300);

        assert!(tracker.should_alert(&id, "BTC", at(0), interval).await);
        assert!(!tracker.should_alert(&id, "BTC", at(200), interval).await);
        assert_eq!(tracker.last_alert(&id, "BTC").await, Some(at(0)));
        assert!(tracker.should_alert(&id, "BTC", at(310), interval).await);
        assert_eq!(tracker.last_alert(&id, "BTC").await, Some(at(310)));
    }

    #[tokio::test]
    async fn test_exact_interval_allows_alert() {
        let tracker = CooldownTracker::new();
        let id = SubscriberId::from(1);
        let interval = Duration::from_secs(60);

        assert!(tracker.should_alert(&id, "ETH", at(0), interval).await);
        assert!(tracker.should_alert(&id, "ETH", at(60), interval).await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let tracker = CooldownTracker::new();
        let alice = SubscriberId::from("alice");
        let bob = SubscriberId::from("bob");
        let interval = Duration::from_secs(300);

        assert!(tracker.should_alert(&alice, "BTC", at(0), interval).await);
        assert!(tracker.should_alert(&alice, "ETH", at(1), interval).await);
        assert!(tracker.should_alert(&bob, "BTC", at(2), interval).await);
        assert!(!tracker.should_alert(&alice, "BTC", at(3), interval).await);
        assert_eq!(tracker.len().await, 3);
    }

    #[tokio::test]
    async fn test_clock_going_backwards_keeps_cooldown() {
        let tracker = CooldownTracker::new();
        let id = SubscriberId::from(7);
        let interval = Duration::from_secs(60);

        assert!(tracker.should_alert(&id, "SOL", at(1000), interval).await);
        assert!(!tracker.should_alert(&id, "SOL", at(0), interval).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checks_fire_once() {
        let tracker = Arc::new(CooldownTracker::new());
        let id = SubscriberId::from(9);
        let mut handles = Vec::new();

        for _ in 0..16 {
            let tracker = tracker.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                tracker
                    .should_alert(&id, "BTC", at(0), Duration::from_secs(300))
                    .await
            }));
        }

        let mut fired = 0;
        for handle in handles {
            if handle.await.unwrap() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
    }
}
