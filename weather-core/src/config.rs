use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::PathBuf, time::Duration};

use crate::model::{AlertRule, City};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "WEATHER_MONITOR_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// poll_interval_secs = 300
///
/// [alert]
/// type = "temperature"
/// threshold = 35.0
///
/// [[cities]]
/// id = 1
/// name = "Delhi"
/// lat = 28.7041
/// lon = 77.1025
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenWeather API key.
    pub api_key: Option<String>,

    /// Scheme and host of the weather endpoint, without the `/data/2.5/weather` path.
    pub base_url: String,

    pub poll_interval_secs: u64,

    pub request_timeout_secs: u64,

    /// Cap on the alert log. `None` keeps every alert for the lifetime of the process.
    pub max_alerts: Option<usize>,

    /// Rule active when the dashboard starts.
    pub alert: AlertRule,

    pub cities: Vec<City>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_alerts: None,
            alert: AlertRule::default(),
            cities: default_cities(),
        }
    }
}

/// The six Indian metros monitored out of the box.
pub fn default_cities() -> Vec<City> {
    vec![
        City::new(1, "Delhi", 28.7041, 77.1025),
        City::new(2, "Mumbai", 19.0760, 72.8777),
        City::new(3, "Chennai", 13.0827, 80.2707),
        City::new(4, "Bangalore", 12.9716, 77.5946),
        City::new(5, "Kolkata", 22.5726, 88.3639),
        City::new(6, "Hyderabad", 17.3850, 78.4867),
    ]
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents).context("Invalid configuration TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-monitor", "weather-monitor")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.cities.is_empty() {
            bail!("No cities configured; add at least one [[cities]] entry.");
        }

        let mut seen = HashSet::new();
        for city in &self.cities {
            if !seen.insert(city.id) {
                bail!("Duplicate city id {} ({}) in configuration.", city.id, city.name);
            }
        }

        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be greater than zero.");
        }

        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero.");
        }

        Ok(())
    }

    /// Returns the API key, preferring the environment over the stored value.
    pub fn api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.stored_api_key().map(str::to_owned).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `weather-monitor configure` or set {API_KEY_ENV}."
            )
        })
    }

    pub fn stored_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn set_alert_rule(&mut self, rule: AlertRule) {
        self.alert = rule;
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
