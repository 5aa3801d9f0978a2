//! solarpeek - SolarEdge site dashboard in the terminal
//!
//! Polls the SolarEdge monitoring API, keeps the last snapshot in a short-lived
//! cache, and shows current power, today's energy and the last 30 days.

mod app;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, Timelike};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::{App, AppState};
use solarpeek::cache::{SnapshotCache, StorageError};
use solarpeek::cli::{Cli, Command, StartupConfig};
use solarpeek::config::{Credentials, Settings, SettingsError};
use solarpeek::data::metrics::to_kw;
use solarpeek::data::{DashboardMetrics, EnergySource, SiteApi, SolarEdgeClient};
use solarpeek::refresh::{LoadError, RefreshPolicy, SnapshotSource, Trigger};

type BoxError = Box<dyn std::error::Error>;

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Routes logs to `log_file` when given (the dashboard owns the terminal), else stderr
fn init_logging(log_file: Option<PathBuf>) {
    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter("solarpeek=info"))
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
            return;
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("solarpeek=warn"))
        .with_writer(io::stderr)
        .init();
}

/// Renders the UI based on the current application state
fn render_ui(frame: &mut ratatui::Frame, app: &App) {
    match &app.state {
        AppState::Loading => render_loading(frame),
        AppState::Dashboard => ui::render_dashboard(frame, app),
        AppState::Failed(message) => ui::render_error(frame, message),
    }
    if app.show_help {
        ui::render_help_overlay(frame, app.refresh_minutes());
    }
}

/// Renders a loading message while data is being fetched
fn render_loading(frame: &mut ratatui::Frame) {
    use ratatui::{
        layout::{Alignment, Constraint, Direction, Layout},
        style::{Color, Style},
        widgets::Paragraph,
    };

    let area = frame.area();

    // Center the loading message vertically
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Percentage(45),
        ])
        .split(area);

    let loading_text = Paragraph::new("Loading solar data...")
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);

    frame.render_widget(loading_text, chunks[1]);
}

/// Settings path from the flag, or the XDG default
fn settings_path(startup: &StartupConfig) -> Result<PathBuf, SettingsError> {
    match &startup.settings_path {
        Some(path) => Ok(path.clone()),
        None => Settings::default_path().ok_or(SettingsError::Unavailable),
    }
}

fn build_policy(settings: &Settings) -> RefreshPolicy {
    let client = SolarEdgeClient::with_base_url(settings.base_url.clone());
    let cache = SnapshotCache::new().map(|c| c.with_expiry(settings.cache_expiry()));
    RefreshPolicy::new(Arc::new(client), cache).with_refresh_minutes(settings.refresh_interval().as_secs() / 60)
}

async fn run_dashboard(settings: Settings) -> Result<(), BoxError> {
    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let policy = Arc::new(build_policy(&settings));
    let mut app = App::new(settings, policy);
    app.start();

    // Main event loop
    loop {
        app.tick();

        // Render UI
        terminal.draw(|f| render_ui(f, &app))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        // Check if we should quit
        if app.should_quit {
            break;
        }
    }

    app.stop().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}

fn print_metrics(metrics: &DashboardMetrics, source: SnapshotSource) {
    let source_note = match metrics.energy_source {
        EnergySource::Overview => "site overview",
        EnergySource::Derived => "summed from quarter-hour data",
    };
    let updated = metrics.fetched_at.with_timezone(&Local);

    println!("Current power: {:.2} kW", metrics.current_power_kw);
    println!("Today's energy: {:.2} kWh ({})", metrics.today_energy_kwh, source_note);
    println!(
        "Last update: {}{}",
        updated.format("%Y-%m-%d %H:%M:%S"),
        if source == SnapshotSource::Cache { " (cached)" } else { "" }
    );
    if let Some(best) = metrics
        .daily
        .iter()
        .max_by(|a, b| a.value.total_cmp(&b.value))
    {
        println!("Best day (30 days): {} with {:.1} kWh", best.label, best.value);
    }
}

async fn run_status(settings: &Settings, force: bool, json: bool) -> Result<(), BoxError> {
    let policy = build_policy(settings);
    let trigger = if force { Trigger::Manual } else { Trigger::Scheduled };

    let outcome = policy
        .load(trigger, settings.credentials().as_ref())
        .await
        .map_err(|e| e.user_message())?;
    let metrics = DashboardMetrics::from_snapshot(&outcome.snapshot);

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        print_metrics(&metrics, outcome.source);
    }
    if let Some(warning) = outcome.warning {
        eprintln!("{}", warning);
    }
    Ok(())
}

fn require_credentials(settings: &Settings) -> Result<Credentials, LoadError> {
    settings.credentials().ok_or(LoadError::Configuration)
}

async fn run_power(settings: &Settings, hours: u32) -> Result<(), BoxError> {
    let credentials = require_credentials(settings)?;
    let client = SolarEdgeClient::with_base_url(settings.base_url.clone());

    let end = Local::now().naive_local().with_nanosecond(0).unwrap_or_default();
    let start = end - chrono::Duration::hours(hours as i64);
    let series = client.fetch_power_series(&credentials, start, end).await?;

    let unit = series.unit.as_deref();
    for sample in &series.values {
        if let Some(value) = sample.value {
            println!("{}  {:>6.2} kW", sample.date.format("%m-%d %H:%M"), to_kw(value, unit));
        }
    }
    Ok(())
}

/// Fetches the power flow once and describes the result
async fn test_connection(settings: &Settings, credentials: &Credentials) -> Result<String, BoxError> {
    let client = SolarEdgeClient::with_base_url(settings.base_url.clone());
    let flow = client
        .fetch_current_power(credentials)
        .await
        .map_err(|e| format!("Connection failed: {}", e))?;

    Ok(match flow.site_current_power_flow {
        Some(flow) => format!(
            "Connection successful! Connected to {}",
            flow.unit.unwrap_or_else(|| "Site".to_string())
        ),
        None => "Connection successful!".to_string(),
    })
}

async fn run_configure(
    path: &Path,
    settings: Settings,
    api_key: &str,
    site_id: &str,
    skip_test: bool,
) -> Result<(), BoxError> {
    let settings = settings.with_credentials(api_key, site_id)?;
    if !skip_test {
        if let Some(credentials) = settings.credentials() {
            println!("{}", test_connection(&settings, &credentials).await?);
        }
    }
    settings.save(path)?;
    info!(path = %path.display(), "settings saved");
    println!("Settings saved to {}", path.display());
    Ok(())
}

fn run_clear_cache() -> Result<(), BoxError> {
    let cache = SnapshotCache::new().ok_or(StorageError::Unavailable)?;
    cache.clear()?;
    println!("Cache cleared");
    Ok(())
}

async fn run(startup: StartupConfig) -> Result<(), BoxError> {
    let path = settings_path(&startup)?;
    let stored = Settings::load(&path)?;
    let settings = stored
        .clone()
        .with_overrides(startup.api_key.as_deref(), startup.site_id.as_deref());

    match startup.command {
        Command::Dashboard => run_dashboard(settings).await,
        Command::Status { force, json } => run_status(&settings, force, json).await,
        Command::Power { hours } => run_power(&settings, hours).await,
        Command::Configure {
            api_key,
            site_id,
            skip_test,
        } => run_configure(&path, stored, &api_key, &site_id, skip_test).await,
        Command::TestConnection => {
            let credentials = require_credentials(&settings)?;
            println!("{}", test_connection(&settings, &credentials).await?);
            Ok(())
        }
        Command::ClearCache => run_clear_cache(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let startup = match StartupConfig::from_cli(&cli) {
        Ok(startup) => startup,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let log_file = match startup.command {
        Command::Dashboard => SnapshotCache::new().map(|c| c.dir().join("solarpeek.log")),
        _ => None,
    };
    init_logging(log_file);

    if let Err(e) = run(startup).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
