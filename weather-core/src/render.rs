//! Text renderers for the terminal dashboard.
//!
//! Every function here is pure: it reads dashboard state and returns a `String`.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

use crate::{
    dashboard::Dashboard,
    model::{AlertMessage, City, DailySummary, Readings, WeatherSnapshot},
    summary::SummaryHistory,
};

pub const CARD_WIDTH: usize = 30;
pub const CARDS_PER_ROW: usize = 3;
pub const CHART_HEIGHT: usize = 8;
const COLUMN_WIDTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Sun,
    Cloud,
    Rain,
    Snow,
}

impl Icon {
    pub fn for_condition(condition: &str) -> Self {
        match condition.to_lowercase().as_str() {
            "clear" => Icon::Sun,
            "clouds" => Icon::Cloud,
            "rain" => Icon::Rain,
            "snow" => Icon::Snow,
            _ => Icon::Cloud,
        }
    }

    pub fn glyph(&self) -> char {
        match self {
            Icon::Sun => '☀',
            Icon::Cloud => '☁',
            Icon::Rain => '☂',
            Icon::Snow => '❄',
        }
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn pad(line: &str, width: usize) -> String {
    let len = line.chars().count();
    if len >= width {
        line.chars().take(width).collect()
    } else {
        format!("{line}{}", " ".repeat(width - len))
    }
}

/// The lines of one city card, each padded to [`CARD_WIDTH`].
pub fn card_lines(city: &City, snapshot: &WeatherSnapshot) -> Vec<String> {
    let icon = Icon::for_condition(&snapshot.condition).glyph();
    let lines = [
        format!("{} {icon}", city.name),
        format!("  {:.1}°C  {}", snapshot.temp_c(), snapshot.condition),
        format!("  Feels like: {:.1}°C", snapshot.feels_like_c()),
        format!("  Humidity: {}%", snapshot.humidity),
        format!("  Updated: {}", local_time(snapshot.observed_at)),
    ];
    lines.iter().map(|l| pad(l, CARD_WIDTH)).collect()
}

/// Card grid for every configured city with a reading, in configuration order.
pub fn render_cards(cities: &[City], readings: &Readings) -> String {
    let cards: Vec<Vec<String>> = cities
        .iter()
        .filter_map(|city| readings.get(city.id).map(|s| card_lines(city, s)))
        .collect();

    let mut out = String::new();
    for row in cards.chunks(CARDS_PER_ROW) {
        let height = row.iter().map(Vec::len).max().unwrap_or(0);
        for i in 0..height {
            let line: Vec<&str> = row
                .iter()
                .map(|card| card.get(i).map_or("", String::as_str))
                .collect();
            let _ = writeln!(out, "{}", line.join("  ").trim_end());
        }
        out.push('\n');
    }
    out
}

fn plot_row(value: f64, lo: f64, hi: f64) -> usize {
    let span = hi - lo;
    if span <= f64::EPSILON {
        return CHART_HEIGHT / 2;
    }
    let scaled = (value - lo) / span * (CHART_HEIGHT - 1) as f64;
    (scaled.round().max(0.0) as usize).min(CHART_HEIGHT - 1)
}

fn marker(summary: &DailySummary, row: usize, lo: f64, hi: f64) -> char {
    if plot_row(summary.max_temp, lo, hi) == row {
        '^'
    } else if plot_row(summary.avg_temp, lo, hi) == row {
        'o'
    } else if plot_row(summary.min_temp, lo, hi) == row {
        'v'
    } else {
        ' '
    }
}

/// Line chart of max (`^`), average (`o`) and min (`v`) across the history,
/// one column per summary, followed by each entry's dominant condition.
pub fn render_chart(history: &SummaryHistory) -> String {
    let mut out = String::from("Daily Weather Summary (°C)\n");
    if history.is_empty() {
        out.push_str("  no data yet\n");
        return out;
    }

    let entries: Vec<&DailySummary> = history.iter().collect();
    let hi = entries
        .iter()
        .map(|s| s.max_temp)
        .fold(f64::NEG_INFINITY, f64::max);
    let lo = entries
        .iter()
        .map(|s| s.min_temp)
        .fold(f64::INFINITY, f64::min);

    for row in (0..CHART_HEIGHT).rev() {
        let label = lo + (hi - lo) * row as f64 / (CHART_HEIGHT - 1) as f64;
        let _ = write!(out, "{label:>7.1} |");
        for summary in &entries {
            let _ = write!(
                out,
                "{:^width$}",
                marker(summary, row, lo, hi),
                width = COLUMN_WIDTH
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "        +{}", "-".repeat(COLUMN_WIDTH * entries.len()));
    let _ = write!(out, "         ");
    for i in 1..=entries.len() {
        let _ = write!(
            out,
            "{:^width$}",
            format!("#{i}"),
            width = COLUMN_WIDTH
        );
    }
    out.push('\n');
    out.push_str("  ^ max   o avg   v min\n\n");

    out.push_str("Dominant Weather Conditions\n");
    for (i, s) in entries.iter().enumerate() {
        let icon = Icon::for_condition(&s.dominant_condition).glyph();
        let _ = writeln!(
            out,
            "  #{} {}  {icon} {:<12} avg {:.1}  max {:.1}  min {:.1}",
            i + 1,
            s.date_label(),
            s.dominant_condition,
            s.avg_temp,
            s.max_temp,
            s.min_temp,
        );
    }
    out
}

/// The cumulative alert log, oldest first. Empty when nothing has fired.
pub fn render_alerts<'a>(alerts: impl IntoIterator<Item = &'a AlertMessage>) -> String {
    let lines: Vec<String> = alerts
        .into_iter()
        .map(|a| format!("  [{}] {}", local_time(a.raised_at), a.text))
        .collect();

    if lines.is_empty() {
        return String::new();
    }

    format!("Weather Alerts ({})\n{}\n", lines.len(), lines.join("\n"))
}

/// Full screen: header, cards, chart, active rule and alert log.
pub fn render_dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::new();

    let refreshed = dashboard
        .last_refresh()
        .map_or_else(|| "never".to_string(), local_time);
    let _ = writeln!(out, "Weather Monitoring System");
    let _ = writeln!(
        out,
        "{} of {} cities reporting | last refresh {refreshed}\n",
        dashboard.readings().len(),
        dashboard.cities().len(),
    );

    out.push_str(&render_cards(dashboard.cities(), dashboard.readings()));
    out.push_str(&render_chart(dashboard.history()));

    let _ = writeln!(out, "\nActive alert: {}", dashboard.rule());
    let alerts = render_alerts(dashboard.alerts());
    if !alerts.is_empty() {
        out.push('\n');
        out.push_str(&alerts);
    }
    out
}
