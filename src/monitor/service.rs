//! Command-layer facade over the registry and the position source.
//!
//! A front end (bot commands, CLI) calls this instead of touching the
//! registry directly. Status and account queries always fetch fresh data and
//! never consult the cooldown tracker.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{FillStats, SubscriberId, Subscription, SubscriptionRegistry};
use crate::error::{RegistryError, RiskError, ServiceError};
use crate::exchange::{AccountSummary, PositionRecord, PositionSource};
use crate::risk::{Assessment, RiskCalculator, SeverityBasis};

/// One position of a status report.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionStatus {
    pub record: PositionRecord,
    /// Assessment, exclusion, or why the record could not be assessed
    pub outcome: Result<Assessment, RiskError>,
}

impl PositionStatus {
    /// `entry_price * |size|`, when both are known.
    pub fn entry_value(&self) -> Option<Decimal> {
        let size = self.record.size?;
        self.record.entry_price?.checked_mul(size.abs())
    }
}

/// On-demand risk view of one wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub wallet_address: String,
    pub threshold: Decimal,
    pub basis: SeverityBasis,
    /// Repeat-alert interval, when the report is for a subscriber
    pub alert_interval: Option<Duration>,
    pub positions: Vec<PositionStatus>,
    pub total_unrealized_pnl: Decimal,
    pub account_summary: Option<AccountSummary>,
}

impl StatusReport {
    /// Positions currently inside the alert threshold.
    pub fn critical_count(&self) -> usize {
        self.positions
            .iter()
            .filter(|p| matches!(&p.outcome, Ok(a) if a.is_critical()))
            .count()
    }
}

/// Trading statistics plus current exposure of one wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountOverview {
    pub wallet_address: String,
    pub stats: FillStats,
    pub total_unrealized_pnl: Decimal,
    /// Realized plus unrealized PnL
    pub total_account_pnl: Decimal,
    pub account_value: Decimal,
    pub active_positions: usize,
}

/// Registry mutations and read-only queries for the command layer.
pub struct MonitorService {
    registry: Arc<SubscriptionRegistry>,
    source: Arc<dyn PositionSource>,
    calculator: RiskCalculator,
}

impl MonitorService {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        source: Arc<dyn PositionSource>,
        calculator: RiskCalculator,
    ) -> Self {
        Self {
            registry,
            source,
            calculator,
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub async fn subscribe(
        &self,
        subscriber_id: SubscriberId,
        wallet_address: &str,
        threshold: Option<Decimal>,
        interval: Option<Duration>,
    ) -> Result<Subscription, ServiceError> {
        Ok(self
            .registry
            .subscribe(subscriber_id, wallet_address, threshold, interval)
            .await?)
    }

    pub async fn unsubscribe(&self, subscriber_id: &SubscriberId) -> bool {
        self.registry.unsubscribe(subscriber_id).await
    }

    pub async fn update_settings(
        &self,
        subscriber_id: &SubscriberId,
        threshold: Option<Decimal>,
        interval: Option<Duration>,
    ) -> Result<Subscription, ServiceError> {
        Ok(self
            .registry
            .update_settings(subscriber_id, threshold, interval)
            .await?)
    }

    pub async fn get(&self, subscriber_id: &SubscriberId) -> Option<Subscription> {
        self.registry.get(subscriber_id).await
    }

    /// Fresh status of a subscriber's wallet against their own threshold.
    pub async fn status(&self, subscriber_id: &SubscriberId) -> Result<StatusReport, ServiceError> {
        let subscription = self.subscription(subscriber_id).await?;
        let mut report = self
            .status_for_wallet(&subscription.wallet_address, subscription.alert_threshold)
            .await?;
        report.alert_interval = Some(subscription.alert_interval);
        Ok(report)
    }

    /// Fresh status of any wallet against the given threshold.
    #[instrument(skip(self))]
    pub async fn status_for_wallet(
        &self,
        wallet_address: &str,
        threshold: Decimal,
    ) -> Result<StatusReport, ServiceError> {
        let snapshot = self.source.fetch(wallet_address).await?;

        let mut total_unrealized_pnl = Decimal::ZERO;
        let positions: Vec<PositionStatus> = snapshot
            .positions
            .into_iter()
            .map(|record| {
                let outcome = self.calculator.assess(&record, threshold);
                if outcome.is_ok() {
                    total_unrealized_pnl += record.unrealized_pnl.unwrap_or_default();
                }
                PositionStatus { record, outcome }
            })
            .collect();

        debug!(positions = positions.len(), "Status computed");

        Ok(StatusReport {
            wallet_address: wallet_address.to_string(),
            threshold,
            basis: self.calculator.basis(),
            alert_interval: None,
            positions,
            total_unrealized_pnl,
            account_summary: snapshot.account_summary,
        })
    }

    /// Account overview of a subscriber's wallet.
    pub async fn account(
        &self,
        subscriber_id: &SubscriberId,
    ) -> Result<AccountOverview, ServiceError> {
        let subscription = self.subscription(subscriber_id).await?;
        self.account_for_wallet(&subscription.wallet_address).await
    }

    /// Trading statistics from fills plus current positions of any wallet.
    #[instrument(skip(self))]
    pub async fn account_for_wallet(
        &self,
        wallet_address: &str,
    ) -> Result<AccountOverview, ServiceError> {
        let (snapshot, fills) = tokio::try_join!(
            self.source.fetch(wallet_address),
            self.source.fetch_fills(wallet_address)
        )?;

        let stats = FillStats::from_fills(&fills);
        let total_unrealized_pnl: Decimal = snapshot
            .positions
            .iter()
            .filter_map(|p| p.unrealized_pnl)
            .sum();

        Ok(AccountOverview {
            wallet_address: wallet_address.to_string(),
            total_account_pnl: stats.realized_pnl + total_unrealized_pnl,
            stats,
            total_unrealized_pnl,
            account_value: snapshot
                .account_summary
                .map(|s| s.account_value)
                .unwrap_or_default(),
            active_positions: snapshot.positions.len(),
        })
    }

    async fn subscription(
        &self,
        subscriber_id: &SubscriberId,
    ) -> Result<Subscription, ServiceError> {
        let subscription = self.registry.get(subscriber_id).await;
        subscription.ok_or_else(|| RegistryError::NotSubscribed(subscriber_id.clone()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::exchange::{AccountSnapshot, Fill, Leverage, MarginMode, MockPositionSource};
    use rust_decimal_macros::dec;

    fn record(
        instrument: &str,
        value: Decimal,
        liq: Option<Decimal>,
        pnl: Decimal,
    ) -> PositionRecord {
        PositionRecord {
            instrument: instrument.to_string(),
            size: Some(dec!(2)),
            entry_price: Some(dec!(100)),
            position_value: Some(value),
            liquidation_price: liq,
            leverage: Some(Leverage {
                value: dec!(4),
                mode: MarginMode::Cross,
            }),
            unrealized_pnl: Some(pnl),
        }
    }

    fn account_snapshot() -> AccountSnapshot {
        AccountSnapshot {
            positions: vec![
                // price 92 vs liq 90: 2.2%, critical
                record("vntls:OPENAI", dec!(184), Some(dec!(90)), dec!(-16)),
                // estimated liq 75, price 150: safe
                record("BTC", dec!(300), None, dec!(100)),
                PositionRecord {
                    instrument: "ETH".to_string(),
                    ..PositionRecord::default()
                },
            ],
            account_summary: Some(AccountSummary {
                account_value: dec!(1500),
                total_margin_used: dec!(120),
                total_notional: dec!(484),
                total_raw_usd: dec!(1000),
            }),
        }
    }

    fn service_with(source: MockPositionSource) -> MonitorService {
        MonitorService::new(
            Arc::new(SubscriptionRegistry::default()),
            Arc::new(source),
            RiskCalculator::default(),
        )
    }

    #[tokio::test]
    async fn test_status_for_subscriber() {
        let mut source = MockPositionSource::new();
        source
            .expect_fetch()
            .withf(|wallet| wallet == "0xabc")
            .times(2)
            .returning(|_| Ok(account_snapshot()));

        let service = service_with(source);
        service
            .subscribe(SubscriberId::from(7), "0xabc", Some(dec!(5)), None)
            .await
            .unwrap();

        let report = service.status(&SubscriberId::from(7)).await.unwrap();
        assert_eq!(report.threshold, dec!(5));
        assert_eq!(report.alert_interval, Some(Duration::from_secs(300)));
        assert_eq!(report.positions.len(), 3);
        assert_eq!(report.critical_count(), 1);
        assert!(report.positions[2].outcome.is_err());
        assert_eq!(report.positions[0].entry_value(), Some(dec!(200)));
        assert_eq!(report.total_unrealized_pnl, dec!(84));
        assert_eq!(report.account_summary.unwrap().account_value, dec!(1500));

        // Status is never gated: a second query computes the same result
        let again = service.status(&SubscriberId::from(7)).await.unwrap();
        assert_eq!(again.critical_count(), 1);
    }

    #[tokio::test]
    async fn test_status_requires_subscription() {
        let service = service_with(MockPositionSource::new());
        let err = service.status(&SubscriberId::from(1)).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::Registry(RegistryError::NotSubscribed(SubscriberId::from(1)))
        );
    }

    #[tokio::test]
    async fn test_status_fetch_failure() {
        let mut source = MockPositionSource::new();
        source
            .expect_fetch()
            .returning(|wallet| Err(SourceError::fetch_failed(wallet, "HTTP 502")));

        let service = service_with(source);
        let err = service.status_for_wallet("0xdead", dec!(5)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Source(_)));
        assert!(err.user_message().contains("try again"));
    }

    #[tokio::test]
    async fn test_account_overview() {
        let mut source = MockPositionSource::new();
        source.expect_fetch().returning(|_| Ok(account_snapshot()));
        source.expect_fetch_fills().returning(|_| {
            Ok(vec![
                Fill {
                    instrument: "vntls:OPENAI".to_string(),
                    closed_pnl: dec!(50),
                },
                Fill {
                    instrument: "BTC".to_string(),
                    closed_pnl: dec!(-20),
                },
                Fill {
                    instrument: "BTC".to_string(),
                    closed_pnl: Decimal::ZERO,
                },
            ])
        });

        let service = service_with(source);
        service
            .subscribe(SubscriberId::from("ops"), "0xabc", None, None)
            .await
            .unwrap();

        let overview = service.account(&SubscriberId::from("ops")).await.unwrap();
        assert_eq!(overview.stats.total_trades, 3);
        assert_eq!(overview.stats.win_rate, dec!(50));
        assert_eq!(overview.stats.realized_pnl, dec!(30));
        assert_eq!(overview.total_unrealized_pnl, dec!(84));
        assert_eq!(overview.total_account_pnl, dec!(114));
        assert_eq!(overview.account_value, dec!(1500));
        assert_eq!(overview.active_positions, 3);
    }

    #[tokio::test]
    async fn test_update_settings_passthrough() {
        let service = service_with(MockPositionSource::new());
        let id = SubscriberId::from(3);

        assert!(matches!(
            service.update_settings(&id, Some(dec!(10)), None).await,
            Err(ServiceError::Registry(RegistryError::NotSubscribed(_)))
        ));

        service.subscribe(id.clone(), "0x1", None, None).await.unwrap();
        let updated = service
            .update_settings(&id, Some(dec!(10)), Some(Duration::from_secs(120)))
            .await
            .unwrap();
        assert_eq!(updated.alert_threshold, dec!(10));
        assert_eq!(service.get(&id).await, Some(updated));

        assert!(service.unsubscribe(&id).await);
        assert!(!service.unsubscribe(&id).await);
    }
}
