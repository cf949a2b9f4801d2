use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const KELVIN_OFFSET: f64 = 273.15;

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// A monitored location. Loaded from configuration and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: u32,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl City {
    pub fn new(id: u32, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id,
            name: name.into(),
            lat,
            lon,
        }
    }
}

/// Latest reading for one city. Temperatures are stored in Kelvin as delivered by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub condition: String,
    pub temp_k: f64,
    pub feels_like_k: f64,
    pub humidity: u8,
    pub observed_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn temp_c(&self) -> f64 {
        kelvin_to_celsius(self.temp_k)
    }

    pub fn feels_like_c(&self) -> f64 {
        kelvin_to_celsius(self.feels_like_k)
    }
}

/// Per-cycle mapping from city id to snapshot.
///
/// Iteration follows insertion order, which is the configured city order
/// when built by a poll cycle. Inserting an id twice replaces the earlier
/// snapshot in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Readings {
    entries: IndexMap<u32, WeatherSnapshot>,
}

impl Readings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, city_id: u32, snapshot: WeatherSnapshot) {
        self.entries.insert(city_id, snapshot);
    }

    pub fn get(&self, city_id: u32) -> Option<&WeatherSnapshot> {
        self.entries.get(&city_id)
    }

    pub fn contains(&self, city_id: u32) -> bool {
        self.entries.contains_key(&city_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &WeatherSnapshot)> {
        self.entries.iter().map(|(id, snapshot)| (*id, snapshot))
    }

    pub fn city_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &WeatherSnapshot> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Aggregate over every city present in one cycle. Temperatures in Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub avg_temp: f64,
    pub max_temp: f64,
    pub min_temp: f64,
    pub dominant_condition: String,
}

impl DailySummary {
    pub fn date_label(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// The single active alert condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AlertRule {
    /// Fires when a city's Celsius temperature strictly exceeds `threshold`.
    Temperature { threshold: f64 },
    /// Fires when a city's condition label equals `target`, ignoring case.
    Condition { target: String },
}

impl Default for AlertRule {
    fn default() -> Self {
        AlertRule::Temperature { threshold: 35.0 }
    }
}

impl std::fmt::Display for AlertRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertRule::Temperature { threshold } => write!(f, "temperature > {threshold}°C"),
            AlertRule::Condition { target } => write!(f, "condition = {target}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub raised_at: DateTime<Utc>,
    pub text: String,
}
