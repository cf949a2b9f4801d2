//! Dashboard state and the update functions that mutate it.

use std::collections::VecDeque;

use chrono::{DateTime, Local, Utc};
use tracing::{debug, info};

use crate::{
    alert,
    model::{AlertMessage, AlertRule, City, DailySummary, Readings},
    summary::{self, SummaryHistory},
};

/// Everything the renderers display.
///
/// Owned by exactly one controller (the poll task). Renderers take `&Dashboard`.
#[derive(Debug, Clone)]
pub struct Dashboard {
    cities: Vec<City>,
    readings: Readings,
    history: SummaryHistory,
    rule: AlertRule,
    alerts: VecDeque<AlertMessage>,
    max_alerts: Option<usize>,
    last_refresh: Option<DateTime<Utc>>,
}

impl Dashboard {
    pub fn new(cities: Vec<City>, rule: AlertRule) -> Self {
        Self {
            cities,
            readings: Readings::new(),
            history: SummaryHistory::new(),
            rule,
            alerts: VecDeque::new(),
            max_alerts: None,
            last_refresh: None,
        }
    }

    /// Caps the alert log, dropping the oldest entries once `limit` is exceeded.
    pub fn with_alert_limit(mut self, limit: Option<usize>) -> Self {
        self.max_alerts = limit;
        self.trim_alerts();
        self
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn readings(&self) -> &Readings {
        &self.readings
    }

    pub fn history(&self) -> &SummaryHistory {
        &self.history
    }

    pub fn rule(&self) -> &AlertRule {
        &self.rule
    }

    pub fn alerts(&self) -> impl Iterator<Item = &AlertMessage> {
        self.alerts.iter()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    pub fn replace_readings(&mut self, readings: Readings) {
        self.readings = readings;
    }

    pub fn append_summary(&mut self, summary: DailySummary) {
        self.history.push(summary);
    }

    pub fn append_alerts(&mut self, alerts: impl IntoIterator<Item = AlertMessage>) {
        self.alerts.extend(alerts);
        self.trim_alerts();
    }

    /// Swap the active rule. Takes effect from the next evaluation; past alerts stay in the log.
    pub fn replace_rule(&mut self, rule: AlertRule) {
        info!(rule = %rule, "alert rule replaced");
        self.rule = rule;
    }

    /// Apply one completed poll cycle: store readings, fold a summary, evaluate the rule.
    ///
    /// Returns the number of alerts raised this cycle.
    pub fn apply_cycle(&mut self, readings: Readings, now: DateTime<Utc>) -> usize {
        let today = now.with_timezone(&Local).date_naive();

        match summary::aggregate(&readings, today) {
            Some(s) => self.append_summary(s),
            None => debug!("no readings this cycle, summary skipped"),
        }

        let raised = alert::evaluate(&self.rule, &self.cities, &readings, now);
        let count = raised.len();
        self.append_alerts(raised);

        self.replace_readings(readings);
        self.last_refresh = Some(now);
        count
    }

    fn trim_alerts(&mut self) {
        if let Some(limit) = self.max_alerts {
            while self.alerts.len() > limit {
                self.alerts.pop_front();
            }
        }
    }
}
