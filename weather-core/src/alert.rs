use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{AlertMessage, AlertRule, City, Readings};

#[derive(Debug, Error, PartialEq)]
pub enum RuleParseError {
    #[error("empty alert rule; expected `temperature <number>` or `condition <text>`")]
    Empty,
    #[error("unknown alert type '{0}'; supported types: temperature, condition")]
    UnknownKind(String),
    #[error("invalid temperature threshold '{0}'")]
    InvalidThreshold(String),
    #[error("missing parameter for {0} alert")]
    MissingParameter(&'static str),
}

impl FromStr for AlertRule {
    type Err = RuleParseError;

    /// Accepts `temperature 35`, `temp 35` or `condition Rain`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RuleParseError::Empty);
        }

        let (kind, param) = match s.split_once(char::is_whitespace) {
            Some((kind, rest)) => (kind, rest.trim()),
            None => (s, ""),
        };

        match kind.to_lowercase().as_str() {
            "temperature" | "temp" => {
                if param.is_empty() {
                    return Err(RuleParseError::MissingParameter("temperature"));
                }
                let threshold: f64 = param
                    .parse()
                    .map_err(|_| RuleParseError::InvalidThreshold(param.to_string()))?;
                if !threshold.is_finite() {
                    return Err(RuleParseError::InvalidThreshold(param.to_string()));
                }
                Ok(AlertRule::Temperature { threshold })
            }
            "condition" => {
                if param.is_empty() {
                    return Err(RuleParseError::MissingParameter("condition"));
                }
                Ok(AlertRule::Condition {
                    target: param.to_string(),
                })
            }
            _ => Err(RuleParseError::UnknownKind(kind.to_string())),
        }
    }
}

/// Check every reading against `rule`, in readings order.
///
/// Readings whose city id is not in `cities` are ignored, as there is no
/// name to report.
pub fn evaluate(
    rule: &AlertRule,
    cities: &[City],
    readings: &Readings,
    now: DateTime<Utc>,
) -> Vec<AlertMessage> {
    readings
        .iter()
        .filter_map(|(city_id, snapshot)| {
            let city = cities.iter().find(|c| c.id == city_id)?;
            let text = match rule {
                AlertRule::Temperature { threshold } => {
                    let temp = snapshot.temp_c();
                    (temp > *threshold).then(|| temperature_text(&city.name, temp, *threshold))
                }
                AlertRule::Condition { target } => {
                    let matched = snapshot.condition.to_lowercase() == target.to_lowercase();
                    matched.then(|| format!("Alert: {target} condition detected in {}", city.name))
                }
            }?;
            Some(AlertMessage {
                raised_at: now,
                text,
            })
        })
        .collect()
}

fn temperature_text(city: &str, temp: f64, threshold: f64) -> String {
    format!("Alert: Temperature in {city} ({temp:.1}°C) exceeds threshold of {threshold}°C")
}
