//! In-memory subscription registry shared by the command layer and scheduler.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

use super::{SubscriberId, Subscription};
use crate::config::SubscriptionConfig;
use crate::error::RegistryError;
use crate::risk::SeverityBasis;

/// Defaults and bounds applied by registry mutations.
#[derive(Debug, Clone)]
pub struct RegistryLimits {
    pub default_threshold: Decimal,
    pub default_interval: Duration,
    /// None means no upper bound (dollar basis)
    pub max_threshold: Option<Decimal>,
    pub min_interval: Duration,
}

impl RegistryLimits {
    pub fn from_config(config: &SubscriptionConfig, basis: SeverityBasis) -> Self {
        Self {
            default_threshold: config.default_threshold,
            default_interval: Duration::from_secs(config.default_interval_secs),
            max_threshold: basis.max_threshold(config.max_percent_threshold),
            min_interval: Duration::from_secs(config.min_interval_secs),
        }
    }

    fn check_threshold(&self, threshold: Decimal) -> Result<(), RegistryError> {
        if threshold <= Decimal::ZERO {
            return Err(RegistryError::InvalidThreshold {
                value: threshold,
                reason: "must be greater than 0".to_string(),
            });
        }
        if let Some(max) = self.max_threshold {
            if threshold > max {
                return Err(RegistryError::InvalidThreshold {
                    value: threshold,
                    reason: format!("must be at most {}", max),
                });
            }
        }
        Ok(())
    }

    fn check_interval(&self, interval: Duration) -> Result<(), RegistryError> {
        if interval < self.min_interval {
            return Err(RegistryError::InvalidInterval {
                secs: interval.as_secs(),
                min_secs: self.min_interval.as_secs(),
            });
        }
        Ok(())
    }
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self::from_config(&SubscriptionConfig::default(), SeverityBasis::default())
    }
}

/// One record per subscriber behind a single lock.
///
/// Snapshots are taken under the read lock, so they never observe a record
/// mid-mutation.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<BTreeMap<SubscriberId, Subscription>>,
    limits: RegistryLimits,
}

impl SubscriptionRegistry {
    pub fn new(limits: RegistryLimits) -> Self {
        Self {
            subscriptions: RwLock::new(BTreeMap::new()),
            limits,
        }
    }

    pub fn limits(&self) -> &RegistryLimits {
        &self.limits
    }

    /// Insert or overwrite a subscriber's record (last subscribe wins).
    ///
    /// Missing settings take the configured defaults; given settings must
    /// satisfy the same bounds as [`Self::update_settings`].
    pub async fn subscribe(
        &self,
        subscriber_id: SubscriberId,
        wallet_address: &str,
        threshold: Option<Decimal>,
        interval: Option<Duration>,
    ) -> Result<Subscription, RegistryError> {
        let alert_threshold = threshold.unwrap_or(self.limits.default_threshold);
        let alert_interval = interval.unwrap_or(self.limits.default_interval);
        self.limits.check_threshold(alert_threshold)?;
        self.limits.check_interval(alert_interval)?;

        let subscription = Subscription {
            subscriber_id: subscriber_id.clone(),
            wallet_address: wallet_address.to_string(),
            alert_threshold,
            alert_interval,
        };

        let replaced = self
            .subscriptions
            .write()
            .await
            .insert(subscriber_id.clone(), subscription.clone());

        info!(
            subscriber = %subscriber_id,
            wallet = %wallet_address,
            threshold = %alert_threshold,
            interval_secs = alert_interval.as_secs(),
            replaced = replaced.is_some(),
            "Subscribed"
        );

        Ok(subscription)
    }

    /// Remove a subscriber; returns whether a record existed.
    pub async fn unsubscribe(&self, subscriber_id: &SubscriberId) -> bool {
        let removed = self.subscriptions.write().await.remove(subscriber_id).is_some();
        if removed {
            info!(subscriber = %subscriber_id, "Unsubscribed");
        }
        removed
    }

    /// Change threshold and/or interval of an existing subscriber.
    ///
    /// Validation happens before any field is written, so a rejected update
    /// leaves the record untouched.
    pub async fn update_settings(
        &self,
        subscriber_id: &SubscriberId,
        threshold: Option<Decimal>,
        interval: Option<Duration>,
    ) -> Result<Subscription, RegistryError> {
        let mut subscriptions = self.subscriptions.write().await;
        let subscription = subscriptions
            .get_mut(subscriber_id)
            .ok_or_else(|| RegistryError::NotSubscribed(subscriber_id.clone()))?;

        if let Some(t) = threshold {
            self.limits.check_threshold(t)?;
        }
        if let Some(i) = interval {
            self.limits.check_interval(i)?;
        }

        if let Some(t) = threshold {
            subscription.alert_threshold = t;
        }
        if let Some(i) = interval {
            subscription.alert_interval = i;
        }

        info!(
            subscriber = %subscriber_id,
            threshold = %subscription.alert_threshold,
            interval_secs = subscription.alert_interval.as_secs(),
            "Settings updated"
        );

        Ok(subscription.clone())
    }

    pub async fn get(&self, subscriber_id: &SubscriberId) -> Option<Subscription> {
        self.subscriptions.read().await.get(subscriber_id).cloned()
    }

    /// Point-in-time copy of all subscriptions, ordered by subscriber id.
    pub async fn snapshot(&self) -> Vec<Subscription> {
        self.subscriptions.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscriptions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_subscribe_applies_defaults() {
        let registry = SubscriptionRegistry::default();
        let id = SubscriberId::from(1);

        registry.subscribe(id.clone(), "0xaaa", None, None).await.unwrap();

        let sub = registry.get(&id).await.unwrap();
        assert_eq!(sub.wallet_address, "0xaaa");
        assert_eq!(sub.alert_threshold, dec!(5.0));
        assert_eq!(sub.alert_interval, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_subscribe_twice_overwrites() {
        let registry = SubscriptionRegistry::default();
        let id = SubscriberId::from(1);

        registry.subscribe(id.clone(), "0xfirst", None, None).await.unwrap();
        registry
            .subscribe(id.clone(), "0xsecond", Some(dec!(2)), None)
            .await
            .unwrap();

        assert_eq!(registry.len().await, 1);
        let sub = registry.get(&id).await.unwrap();
        assert_eq!(sub.wallet_address, "0xsecond");
        assert_eq!(sub.alert_threshold, dec!(2));

        let wallets: Vec<_> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|s| s.wallet_address)
            .collect();
        assert_eq!(wallets, vec!["0xsecond".to_string()]);
    }

    #[tokio::test]
    async fn test_subscribe_rejects_short_interval() {
        let registry = SubscriptionRegistry::default();
        let err = registry
            .subscribe(SubscriberId::from(1), "0xaaa", None, Some(Duration::from_secs(30)))
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::InvalidInterval { secs: 30, min_secs: 60 });
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_unsubscribe_reports_existence() {
        let registry = SubscriptionRegistry::default();
        let id = SubscriberId::from(1);

        assert!(!registry.unsubscribe(&id).await);
        registry.subscribe(id.clone(), "0xaaa", None, None).await.unwrap();
        assert!(registry.unsubscribe(&id).await);
        assert!(registry.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_subscriber_fails_without_creating() {
        let registry = SubscriptionRegistry::default();
        let id = SubscriberId::from(99);

        let err = registry
            .update_settings(&id, Some(dec!(3)), None)
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::NotSubscribed(id.clone()));
        assert!(registry.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_update_round_trip() {
        let registry = SubscriptionRegistry::default();
        let id = SubscriberId::from(5);
        registry.subscribe(id.clone(), "0xwallet", None, None).await.unwrap();

        registry
            .update_settings(&id, Some(dec!(3)), Some(Duration::from_secs(120)))
            .await
            .unwrap();

        let sub = registry.get(&id).await.unwrap();
        assert_eq!(sub.alert_threshold, dec!(3));
        assert_eq!(sub.alert_interval, Duration::from_secs(120));
        assert_eq!(sub.wallet_address, "0xwallet");
        assert_eq!(sub.subscriber_id, id);
    }

    #[tokio::test]
    async fn test_update_leaves_unspecified_fields() {
        let registry = SubscriptionRegistry::default();
        let id = SubscriberId::from(5);
        registry
            .subscribe(id.clone(), "0xwallet", Some(dec!(7)), Some(Duration::from_secs(600)))
            .await
            .unwrap();

        registry.update_settings(&id, None, Some(Duration::from_secs(90))).await.unwrap();
        let sub = registry.get(&id).await.unwrap();
        assert_eq!(sub.alert_threshold, dec!(7));
        assert_eq!(sub.alert_interval, Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_update_validation_is_all_or_nothing() {
        let registry = SubscriptionRegistry::default();
        let id = SubscriberId::from(5);
        registry.subscribe(id.clone(), "0xwallet", None, None).await.unwrap();

        for bad in [dec!(0), dec!(-1), dec!(50.01)] {
            let err = registry
                .update_settings(&id, Some(bad), Some(Duration::from_secs(120)))
                .await
                .unwrap_err();
            assert!(matches!(err, RegistryError::InvalidThreshold { .. }));
        }

        let err = registry
            .update_settings(&id, Some(dec!(3)), Some(Duration::from_secs(59)))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidInterval { .. }));

        let sub = registry.get(&id).await.unwrap();
        assert_eq!(sub.alert_threshold, dec!(5.0));
        assert_eq!(sub.alert_interval, Duration::from_secs(300));

        registry.update_settings(&id, Some(dec!(50)), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_dollar_basis_has_no_upper_bound() {
        let limits =
            RegistryLimits::from_config(&SubscriptionConfig::default(), SeverityBasis::Dollar);
        let registry = SubscriptionRegistry::new(limits);
        let id = SubscriberId::from(1);

        registry
            .subscribe(id.clone(), "0xwallet", Some(dec!(1000)), None)
            .await
            .unwrap();
        assert_eq!(registry.get(&id).await.unwrap().alert_threshold, dec!(1000));
    }

    #[tokio::test]
    async fn test_snapshot_is_ordered() {
        let registry = SubscriptionRegistry::default();
        for id in ["c", "a", "b"] {
            registry.subscribe(SubscriberId::from(id), "0x", None, None).await.unwrap();
        }
        let ids: Vec<_> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|s| s.subscriber_id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
