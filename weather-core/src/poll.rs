//! Timer-driven fetch loop.
//!
//! The poll task owns the [`Dashboard`]. Every mutation happens on that task,
//! either after a completed cycle or when a new rule arrives over the channel.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    dashboard::Dashboard,
    model::{AlertRule, City, Readings},
    provider::WeatherProvider,
};

const RULE_CHANNEL_CAPACITY: usize = 8;

/// Fetch every city once, in order, one request at a time.
///
/// A failed city is logged and left out; the rest of the round continues.
pub async fn poll_cycle(provider: &dyn WeatherProvider, cities: &[City]) -> Readings {
    let started = Instant::now();
    let mut readings = Readings::new();
    let mut failed = 0usize;

    for city in cities {
        match provider.fetch(city).await {
            Ok(snapshot) => readings.insert(city.id, snapshot),
            Err(err) => {
                failed += 1;
                warn!(city = %city.name, error = %format!("{err:#}"), "weather fetch failed");
            }
        }
    }

    info!(
        ok = readings.len(),
        failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "poll cycle complete"
    );
    readings
}

/// Run a single cycle and fold it into `dashboard`.
pub async fn refresh_once(provider: &dyn WeatherProvider, dashboard: &mut Dashboard) -> usize {
    let readings = poll_cycle(provider, dashboard.cities()).await;
    dashboard.apply_cycle(readings, Utc::now())
}

/// Handle to the repeating poll task.
///
/// Dropping the handle without calling [`Poller::shutdown`] leaves the task
/// running until the runtime stops.
#[derive(Debug)]
pub struct Poller {
    cancel: CancellationToken,
    rules: mpsc::Sender<AlertRule>,
    handle: JoinHandle<Dashboard>,
}

impl Poller {
    /// Start polling: one cycle immediately, then one per `interval`.
    ///
    /// `on_refresh` runs on the poll task after every cycle and every rule change.
    pub fn spawn<F>(
        provider: Arc<dyn WeatherProvider>,
        dashboard: Dashboard,
        interval: Duration,
        on_refresh: F,
    ) -> Self
    where
        F: FnMut(&Dashboard) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (rules, rules_rx) = mpsc::channel(RULE_CHANNEL_CAPACITY);

        let handle = tokio::spawn(poll_loop(
            provider,
            dashboard,
            interval,
            rules_rx,
            cancel.clone(),
            on_refresh,
        ));

        Self {
            cancel,
            rules,
            handle,
        }
    }

    /// Replace the active rule. Applied by the poll task between cycles.
    pub async fn set_rule(&self, rule: AlertRule) -> Result<()> {
        self.rules
            .send(rule)
            .await
            .map_err(|_| anyhow!("poll task has stopped; rule not applied"))
    }

    /// Stop the interval and wait for the task. A cycle still in flight is
    /// abandoned and its results are discarded.
    pub async fn shutdown(self) -> Result<Dashboard> {
        self.cancel.cancel();
        self.handle.await.context("poll task panicked")
    }
}

async fn poll_loop<F>(
    provider: Arc<dyn WeatherProvider>,
    mut dashboard: Dashboard,
    interval: Duration,
    mut rules_rx: mpsc::Receiver<AlertRule>,
    cancel: CancellationToken,
    mut on_refresh: F,
) -> Dashboard
where
    F: FnMut(&Dashboard) + Send + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    // A slow cycle pushes the next tick back instead of bunching ticks up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        cities = dashboard.cities().len(),
        interval_secs = interval.as_secs(),
        "poll loop started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("poll loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let readings = tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("poll loop shutting down mid-cycle, results discarded");
                        break;
                    }
                    readings = poll_cycle(provider.as_ref(), dashboard.cities()) => readings,
                };

                let raised = dashboard.apply_cycle(readings, Utc::now());
                if raised > 0 {
                    info!(raised, total = dashboard.alert_count(), "alerts raised");
                }
                on_refresh(&dashboard);
            }
            Some(rule) = rules_rx.recv() => {
                dashboard.replace_rule(rule);
                on_refresh(&dashboard);
            }
        }
    }

    dashboard
}
