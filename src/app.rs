//! Application state management for the solarpeek dashboard
//!
//! This module contains the dashboard state, keyboard handling, and the glue
//! between background triggers, spawned loads and what gets rendered.

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use solarpeek::config::Settings;
use solarpeek::data::{ChartPoint, DashboardMetrics};
use solarpeek::refresh::{
    try_recv, LoadError, LoadOutcome, RefreshConfig, RefreshHandle, RefreshPolicy, Trigger,
};

/// Application state enum representing the current view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    /// First load has not finished yet
    Loading,
    /// Data is available
    Dashboard,
    /// The last load failed and there is nothing to show
    Failed(String),
}

/// The chart data for one rendering target
///
/// Each load replaces the slot's contents wholesale; the UI only ever reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSlot {
    points: Vec<ChartPoint>,
}

impl ChartSlot {
    pub fn replace(&mut self, points: Vec<ChartPoint>) {
        self.points = points;
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[ChartPoint] {
        &self.points
    }

    /// Largest value in the slot (0 when empty)
    pub fn max_value(&self) -> f64 {
        self.points.iter().map(|p| p.value).fold(0.0, f64::max)
    }
}

/// Result of one spawned load
#[derive(Debug)]
pub struct LoadReport {
    pub trigger: Trigger,
    pub result: Result<LoadOutcome, LoadError>,
}

/// Main application struct managing state and data
pub struct App {
    /// Current application state/view
    pub state: AppState,
    /// Metrics of the snapshot currently shown
    pub metrics: Option<DashboardMetrics>,
    /// Intraday power chart
    pub intraday_chart: ChartSlot,
    /// 30-day energy chart
    pub daily_chart: ChartSlot,
    /// Soft warning or error shown in the status line
    pub notice: Option<String>,
    /// When the data on screen was fetched or cached
    pub last_update: Option<DateTime<Local>>,
    /// Number of loads spawned but not yet reported
    pub loads_in_flight: usize,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Flag indicating a manual refresh has been requested
    pub refresh_requested: bool,
    /// Flag indicating the cache should be cleared
    pub clear_cache_requested: bool,
    /// Flag to show help overlay
    pub show_help: bool,
    settings: Settings,
    policy: Arc<RefreshPolicy>,
    refresh: Option<RefreshHandle>,
    reports_tx: mpsc::UnboundedSender<LoadReport>,
    reports_rx: mpsc::UnboundedReceiver<LoadReport>,
}

impl App {
    /// Creates a new App; no background work starts until [`App::start`]
    pub fn new(settings: Settings, policy: Arc<RefreshPolicy>) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self {
            state: AppState::Loading,
            metrics: None,
            intraday_chart: ChartSlot::default(),
            daily_chart: ChartSlot::default(),
            notice: None,
            last_update: None,
            loads_in_flight: 0,
            should_quit: false,
            refresh_requested: false,
            clear_cache_requested: false,
            show_help: false,
            settings,
            policy,
            refresh: None,
            reports_tx,
            reports_rx,
        }
    }

    /// Spawns the periodic trigger and the initial load
    pub fn start(&mut self) {
        self.refresh = Some(RefreshHandle::spawn(RefreshConfig {
            interval: self.settings.refresh_interval(),
            enabled: true,
        }));
        self.start_load(Trigger::Scheduled);
    }

    /// Stops the periodic trigger task
    pub async fn stop(&mut self) {
        if let Some(handle) = self.refresh.take() {
            handle.shutdown().await;
        }
    }

    /// Period of the scheduled refresh, in minutes
    pub fn refresh_minutes(&self) -> u64 {
        self.settings.refresh_interval().as_secs() / 60
    }

    /// Whether a load is currently running
    pub fn is_loading(&self) -> bool {
        self.loads_in_flight > 0
    }

    /// Spawns one load; the policy serializes it against any other
    pub fn start_load(&mut self, trigger: Trigger) {
        self.loads_in_flight += 1;
        let policy = Arc::clone(&self.policy);
        let credentials = self.settings.credentials();
        let tx = self.reports_tx.clone();

        tokio::spawn(async move {
            let result = policy.load(trigger, credentials.as_ref()).await;
            let _ = tx.send(LoadReport { trigger, result });
        });
    }

    /// Processes pending requests, triggers and load reports
    ///
    /// Called once per iteration of the event loop.
    pub fn tick(&mut self) {
        if self.refresh_requested {
            self.refresh_requested = false;
            match self.refresh.as_ref() {
                Some(handle) => handle.request_refresh(),
                None => self.start_load(Trigger::Manual),
            }
        }

        if self.clear_cache_requested {
            self.clear_cache_requested = false;
            self.clear_cache();
        }

        let mut triggers = Vec::new();
        if let Some(handle) = self.refresh.as_mut() {
            while let Some(trigger) = try_recv(handle) {
                triggers.push(trigger);
            }
        }
        for trigger in triggers {
            self.start_load(trigger);
        }

        while let Ok(report) = self.reports_rx.try_recv() {
            self.apply_report(report);
        }
    }

    /// Updates the view from a finished load
    pub fn apply_report(&mut self, report: LoadReport) {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        debug!(trigger = ?report.trigger, ok = report.result.is_ok(), "load finished");

        match report.result {
            Ok(outcome) => {
                let metrics = DashboardMetrics::from_snapshot(&outcome.snapshot);
                self.intraday_chart.replace(metrics.intraday.clone());
                self.daily_chart.replace(metrics.daily.clone());
                self.metrics = Some(metrics);
                self.last_update = Some(outcome.updated_at.with_timezone(&Local));
                self.notice = outcome.warning;
                self.state = AppState::Dashboard;
            }
            Err(err) => {
                if err.is_rate_limited() {
                    if let Some(handle) = self.refresh.as_ref() {
                        handle.schedule_recovery(self.settings.refresh_interval());
                    }
                }
                let message = err.user_message();
                if self.metrics.is_some() {
                    self.notice = Some(message);
                } else {
                    self.intraday_chart.clear();
                    self.daily_chart.clear();
                    self.state = AppState::Failed(message);
                }
            }
        }
    }

    fn clear_cache(&mut self) {
        let Some(cache) = self.policy.cache() else {
            self.notice = Some("No cache directory available".to_string());
            return;
        };
        match cache.clear() {
            Ok(()) => self.notice = Some("Cache cleared".to_string()),
            Err(e) => {
                warn!(error = %e, "failed to clear cache");
                self.notice = Some(format!("Failed to clear cache: {}", e));
            }
        }
    }

    /// Handles keyboard input and updates state accordingly
    ///
    /// # Key Bindings
    /// - `q` or `Esc`: Quit the application
    /// - `r`: Fetch fresh data, bypassing the cache
    /// - `c`: Clear the cached snapshot
    /// - `?`: Toggle the help overlay
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        // Help overlay intercepts all keys when shown
        if self.show_help {
            if matches!(
                key_event.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                self.show_help = false;
            }
            return;
        }

        match key_event.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('r') => {
                self.refresh_requested = true;
            }
            KeyCode::Char('c') => {
                self.clear_cache_requested = true;
            }
            KeyCode::Char('?') => {
                self.show_help = true;
            }
            _ => {}
        }
    }
}
