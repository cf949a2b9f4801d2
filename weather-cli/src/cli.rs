use std::{fmt, io::Write, ops::ControlFlow, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{CustomType, Password, PasswordDisplayMode, Select, Text};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use weather_monitor_core::{
    AlertRule, Config, Dashboard, Poller, provider_from_config, refresh_once,
    render::render_dashboard,
};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";
const RULE_HINT: &str =
    "Type `temperature <°C>` or `condition <text>` to change the alert, Ctrl-C to quit.";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-monitor",
    version,
    about = "Weather monitoring dashboard for a fixed set of cities"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    /// Choose the alert rule the dashboard starts with.
    Alert,

    /// List the monitored cities.
    Cities,

    /// Poll the weather endpoint and show the live dashboard.
    Watch {
        /// Seconds between poll cycles; overrides the configured interval.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,

        /// Run a single cycle, print the dashboard and exit.
        #[arg(long)]
        once: bool,

        /// Append each refresh instead of redrawing the screen.
        #[arg(long)]
        no_clear: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Alert => configure_alert(),
            Command::Cities => list_cities(),
            Command::Watch { interval, once, no_clear } => watch(interval, once, no_clear).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty.");
    }

    config.set_api_key(api_key.trim().to_string());
    config.save()?;

    println!("Saved API key to {}", Config::config_file_path()?.display());
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum AlertKind {
    Temperature,
    Condition,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Temperature => f.write_str("Temperature"),
            AlertKind::Condition => f.write_str("Weather Condition"),
        }
    }
}

/// Prompt for a complete rule. Nothing is applied until both answers are in.
fn prompt_rule(current: &AlertRule) -> anyhow::Result<AlertRule> {
    let kind = Select::new(
        "Alert type:",
        vec![AlertKind::Temperature, AlertKind::Condition],
    )
    .prompt()?;

    let rule = match kind {
        AlertKind::Temperature => {
            let default = match current {
                AlertRule::Temperature { threshold } => *threshold,
                AlertRule::Condition { .. } => 35.0,
            };
            let threshold = CustomType::<f64>::new("Temperature threshold (°C):")
                .with_default(default)
                .with_error_message("Please type a valid number")
                .prompt()?;
            AlertRule::Temperature { threshold }
        }
        AlertKind::Condition => {
            let target = Text::new("Weather condition:")
                .with_placeholder("e.g., Rain, Snow, Clear")
                .prompt()?;
            let target = target.trim();
            if target.is_empty() {
                bail!("Weather condition must not be empty.");
            }
            AlertRule::Condition {
                target: target.to_string(),
            }
        }
    };

    Ok(rule)
}

fn configure_alert() -> anyhow::Result<()> {
    let mut config = Config::load()?;
    let rule = prompt_rule(&config.alert)?;

    config.set_alert_rule(rule);
    config.save()?;

    println!("Alert set: {}", config.alert);
    Ok(())
}

fn list_cities() -> anyhow::Result<()> {
    let config = Config::load()?;
    for city in &config.cities {
        println!(
            "{:>3}  {:<16} {:>9.4} {:>9.4}",
            city.id, city.name, city.lat, city.lon
        );
    }
    Ok(())
}

async fn watch(interval: Option<u64>, once: bool, no_clear: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let provider = provider_from_config(&config)?;
    let dashboard = Dashboard::new(config.cities.clone(), config.alert.clone())
        .with_alert_limit(config.max_alerts);

    if once {
        let mut dashboard = dashboard;
        refresh_once(provider.as_ref(), &mut dashboard).await;
        print!("{}", render_dashboard(&dashboard));
        return Ok(());
    }

    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.poll_interval());
    let poller = Poller::spawn(Arc::from(provider), dashboard, interval, move |d: &Dashboard| {
        let mut stdout = std::io::stdout().lock();
        let clear = if no_clear { "" } else { CLEAR_SCREEN };
        let _ = write!(stdout, "{clear}{}", render_dashboard(d));
        let _ = writeln!(stdout, "\n{RULE_HINT}");
        let _ = stdout.flush();
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("Failed to listen for Ctrl-C")?;
                info!("interrupt received");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if apply_rule_line(&poller, &line).await.is_break() {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(err) => {
                    warn!(error = %err, "stdin closed");
                    stdin_open = false;
                }
            },
        }
    }

    let dashboard = poller.shutdown().await?;
    info!(
        alerts = dashboard.alert_count(),
        summaries = dashboard.history().len(),
        "dashboard stopped"
    );
    Ok(())
}

/// Parse one line typed while `watch` runs and hand the rule to the poll task.
///
/// Breaks once the poll task can no longer take rules, so the caller falls
/// through to shutdown.
async fn apply_rule_line(poller: &Poller, line: &str) -> ControlFlow<()> {
    if line.trim().is_empty() {
        return ControlFlow::Continue(());
    }

    match line.parse::<AlertRule>() {
        Ok(rule) => {
            if let Err(err) = poller.set_rule(rule).await {
                warn!(error = %err, "failed to apply alert rule");
                return ControlFlow::Break(());
            }
        }
        Err(err) => eprintln!("{err}"),
    }
    ControlFlow::Continue(())
}
