//! Polling loop: fetch, assess, gate and notify for every subscription.
//!
//! A pass fans out one task per subscription (bounded by a semaphore). A
//! failure or panic inside one task is logged and counted, never propagated:
//! the other subscriptions of the same pass are still evaluated.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::{Subscription, SubscriptionRegistry};
use crate::alert::render_alert;
use crate::config::{MonitorConfig, NotifierConfig, SourceConfig};
use crate::exchange::PositionSource;
use crate::notify::Notifier;
use crate::risk::{Assessment, CooldownTracker, RiskCalculator};
use crate::utils::display_name;

/// Timing and fan-out settings for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between the starts of two passes
    pub tick: Duration,
    /// Parallel subscriptions per pass
    pub max_concurrent_fetches: usize,
    /// Upper bound for one wallet fetch
    pub fetch_timeout: Duration,
    /// Upper bound for one alert delivery
    pub delivery_timeout: Duration,
    pub restart_backoff: Duration,
    pub max_restart_backoff: Duration,
}

impl SchedulerConfig {
    pub fn from_config(
        monitor: &MonitorConfig,
        source: &SourceConfig,
        notifier: &NotifierConfig,
    ) -> Self {
        Self {
            tick: Duration::from_secs(monitor.tick_secs),
            max_concurrent_fetches: monitor.max_concurrent_fetches.max(1),
            fetch_timeout: Duration::from_secs(source.request_timeout_secs),
            delivery_timeout: Duration::from_secs(notifier.timeout_secs),
            restart_backoff: Duration::from_secs(monitor.restart_backoff_secs),
            max_restart_backoff: Duration::from_secs(monitor.max_restart_backoff_secs),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_config(
            &MonitorConfig::default(),
            &SourceConfig::default(),
            &NotifierConfig::default(),
        )
    }
}

/// Counters for one polling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub subscriptions: usize,
    pub fetch_failures: usize,
    pub positions: usize,
    pub excluded: usize,
    pub malformed: usize,
    pub critical: usize,
    pub alerts_sent: usize,
    pub alerts_suppressed: usize,
    pub delivery_failures: usize,
    /// Subscription tasks that panicked or were cancelled
    pub task_failures: usize,
}

impl AddAssign for PassSummary {
    fn add_assign(&mut self, other: Self) {
        self.subscriptions += other.subscriptions;
        self.fetch_failures += other.fetch_failures;
        self.positions += other.positions;
        self.excluded += other.excluded;
        self.malformed += other.malformed;
        self.critical += other.critical;
        self.alerts_sent += other.alerts_sent;
        self.alerts_suppressed += other.alerts_suppressed;
        self.delivery_failures += other.delivery_failures;
        self.task_failures += other.task_failures;
    }
}

/// State shared by every subscription task of a pass.
struct PassContext {
    source: Arc<dyn PositionSource>,
    notifier: Arc<dyn Notifier>,
    cooldown: Arc<CooldownTracker>,
    calculator: RiskCalculator,
    fetch_timeout: Duration,
    delivery_timeout: Duration,
}

/// Supervised monitoring loop.
pub struct Scheduler {
    registry: Arc<SubscriptionRegistry>,
    context: Arc<PassContext>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        source: Arc<dyn PositionSource>,
        notifier: Arc<dyn Notifier>,
        cooldown: Arc<CooldownTracker>,
        calculator: RiskCalculator,
        config: SchedulerConfig,
    ) -> Self {
        let context = Arc::new(PassContext {
            source,
            notifier,
            cooldown,
            calculator,
            fetch_timeout: config.fetch_timeout,
            delivery_timeout: config.delivery_timeout,
        });

        Self {
            registry,
            context,
            config,
        }
    }

    /// Run one pass using the current wall clock.
    pub async fn run_pass(&self) -> PassSummary {
        self.run_pass_at(Utc::now()).await
    }

    /// Run one pass over a snapshot of the registry, with `now` as the
    /// timestamp used for cooldown decisions.
    pub async fn run_pass_at(&self, now: DateTime<Utc>) -> PassSummary {
        let subscriptions = self.registry.snapshot().await;
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_fetches));

        let mut handles = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let sem = semaphore.clone();
            let ctx = self.context.clone();
            let subscriber = subscription.subscriber_id.clone();

            let handle: JoinHandle<PassSummary> = tokio::spawn(async move {
                // The semaphore is never closed, so acquire only fails on a bug
                let _permit = sem.acquire_owned().await.ok();
                ctx.evaluate(&subscription, now).await
            });
            handles.push((subscriber, handle));
        }

        let mut summary = PassSummary::default();
        for (subscriber, handle) in handles {
            match handle.await {
                Ok(outcome) => summary += outcome,
                Err(e) => {
                    error!(subscriber = %subscriber, error = %e, "Subscription task failed");
                    summary.subscriptions += 1;
                    summary.task_failures += 1;
                }
            }
        }

        summary
    }

    /// Poll forever: one pass per tick, each pass in its own task so that a
    /// crashed pass is logged and followed by the next tick.
    pub async fn run(self: Arc<Self>) {
        info!(
            tick_secs = self.config.tick.as_secs(),
            max_concurrent = self.config.max_concurrent_fetches,
            "Starting liquidation monitoring loop"
        );

        let mut pass_count: u64 = 0;
        loop {
            let started = Instant::now();
            pass_count += 1;

            let scheduler = self.clone();
            match tokio::spawn(async move { scheduler.run_pass().await }).await {
                Ok(summary) => {
                    info!(
                        pass = pass_count,
                        subscriptions = summary.subscriptions,
                        positions = summary.positions,
                        critical = summary.critical,
                        alerts_sent = summary.alerts_sent,
                        suppressed = summary.alerts_suppressed,
                        fetch_failures = summary.fetch_failures,
                        malformed = summary.malformed,
                        delivery_failures = summary.delivery_failures,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Pass complete"
                    );
                }
                Err(e) => {
                    error!(pass = pass_count, error = %e, "Polling pass crashed");
                }
            }

            tokio::time::sleep(self.config.tick.saturating_sub(started.elapsed())).await;
        }
    }

    /// Spawn the polling loop under a supervisor that restarts it with
    /// exponential backoff if it ever stops.
    pub fn spawn_supervised(self: Arc<Self>) -> JoinHandle<()> {
        let initial = self.config.restart_backoff;
        let max = self.config.max_restart_backoff;
        tokio::spawn(supervise(move || self.clone().run(), initial, max))
    }
}

/// Run the task produced by `start` forever, restarting it after each exit
/// or panic. The delay doubles per restart up to `max` and falls back to
/// `initial` once a run outlives `max`.
async fn supervise<F, Fut>(mut start: F, initial: Duration, max: Duration)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut backoff = initial;
    loop {
        let started = Instant::now();

        match tokio::spawn(start()).await {
            Ok(()) => warn!("Monitoring loop exited unexpectedly"),
            Err(e) => error!(error = %e, "Monitoring loop crashed"),
        }

        if started.elapsed() > max {
            backoff = initial;
        }

        warn!(backoff_secs = backoff.as_secs(), "Restarting monitoring loop");
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(max);
    }
}

impl PassContext {
    /// Fetch, assess and alert for one subscription.
    async fn evaluate(&self, subscription: &Subscription, now: DateTime<Utc>) -> PassSummary {
        let mut summary = PassSummary {
            subscriptions: 1,
            ..PassSummary::default()
        };
        let subscriber = &subscription.subscriber_id;
        let wallet = subscription.wallet_address.as_str();

        let fetch = tokio::time::timeout(self.fetch_timeout, self.source.fetch(wallet)).await;
        let snapshot = match fetch {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                warn!(subscriber = %subscriber, error = %e, "Skipping subscription: fetch failed");
                summary.fetch_failures += 1;
                return summary;
            }
            Err(_) => {
                warn!(
                    subscriber = %subscriber,
                    wallet = %wallet,
                    timeout_secs = self.fetch_timeout.as_secs(),
                    "Skipping subscription: fetch timed out"
                );
                summary.fetch_failures += 1;
                return summary;
            }
        };

        for position in &snapshot.positions {
            summary.positions += 1;

            let risk = match self.calculator.assess(position, subscription.alert_threshold) {
                Ok(Assessment::Assessed(risk)) => risk,
                Ok(Assessment::Excluded(reason)) => {
                    debug!(
                        subscriber = %subscriber,
                        instrument = %position.instrument,
                        reason = %reason,
                        "Position excluded"
                    );
                    summary.excluded += 1;
                    continue;
                }
                Err(e) => {
                    warn!(subscriber = %subscriber, error = %e, "Skipping position");
                    summary.malformed += 1;
                    continue;
                }
            };

            if risk.severity != crate::risk::Severity::Critical {
                continue;
            }
            summary.critical += 1;

            let interval = subscription.alert_interval;
            let allowed = self
                .cooldown
                .should_alert(subscriber, &position.instrument, now, interval)
                .await;
            if !allowed {
                debug!(
                    subscriber = %subscriber,
                    instrument = %position.instrument,
                    "Alert suppressed by cooldown"
                );
                summary.alerts_suppressed += 1;
                continue;
            }

            let text = render_alert(position, &risk);
            let send = self.notifier.send(subscriber, &text);
            let delivery = tokio::time::timeout(self.delivery_timeout, send).await;

            match delivery {
                Ok(Ok(())) => {
                    info!(
                        subscriber = %subscriber,
                        instrument = %display_name(&position.instrument),
                        distance_percent = %risk.distance_percent.round_dp(2),
                        next_alert_in_secs = subscription.alert_interval.as_secs(),
                        "Liquidation alert sent"
                    );
                    summary.alerts_sent += 1;
                }
                Ok(Err(e)) => {
                    warn!(subscriber = %subscriber, error = %e, "Alert delivery failed");
                    summary.delivery_failures += 1;
                }
                Err(_) => {
                    warn!(
                        subscriber = %subscriber,
                        timeout_secs = self.delivery_timeout.as_secs(),
                        "Alert delivery timed out"
                    );
                    summary.delivery_failures += 1;
                }
            }
        }

        summary
    }
}
