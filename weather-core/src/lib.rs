//! Core library for the `weather-monitor` dashboard.
//!
//! This crate defines:
//! - Configuration (API key, endpoint, city list, default alert rule)
//! - The weather provider abstraction and the OpenWeather client
//! - Summary aggregation and alert evaluation over each poll cycle
//! - The dashboard state, the poll loop that owns it, and text renderers
//!
//! It is used by `weather-monitor-cli`, but the poll loop and renderers can be
//! driven by any other front end.

pub mod alert;
pub mod config;
pub mod dashboard;
pub mod model;
pub mod poll;
pub mod provider;
pub mod render;
pub mod summary;

pub use alert::{RuleParseError, evaluate};
pub use config::Config;
pub use dashboard::Dashboard;
pub use model::{
    AlertMessage, AlertRule, City, DailySummary, Readings, WeatherSnapshot, kelvin_to_celsius,
};
pub use poll::{Poller, poll_cycle, refresh_once};
pub use provider::{WeatherProvider, provider_from_config};
pub use summary::{SummaryHistory, aggregate};
