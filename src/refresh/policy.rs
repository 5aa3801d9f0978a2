//! Refresh policy: when to serve the cache, when to fetch, and how to degrade
//!
//! [`RefreshPolicy::load`] is the single entry point. Loads are serialized by
//! an async mutex held for the whole attempt, so at most one fetch is ever in
//! flight and the cache slot is never written by two loads at once. A
//! non-manual trigger that had to wait usually finds the entry the previous
//! load just wrote and returns it without touching the network.

use chrono::{DateTime, Duration, Local, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CachedSnapshot, SnapshotCache};
use crate::config::{Credentials, DEFAULT_REFRESH_MINUTES};
use crate::data::{extract_today_energy_wh, ApiError, Resolution, SiteApi, Snapshot};

/// Number of days covered by the daily energy series
pub const DAILY_WINDOW_DAYS: i64 = 30;

/// Why a load was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// User asked for fresh data; always bypasses the cache
    Manual,
    /// Periodic timer
    Scheduled,
    /// Retry after the API rate limited us
    Recovery,
}

impl Trigger {
    pub fn bypasses_cache(self) -> bool {
        matches!(self, Trigger::Manual)
    }
}

/// Where the snapshot of a successful load came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Remote,
    Cache,
}

/// Result of a successful load
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub snapshot: Snapshot,
    pub source: SnapshotSource,
    /// When the data was fetched (remote) or cached (cache hit)
    pub updated_at: DateTime<Utc>,
    /// Soft warning to show next to the data, e.g. after a rate limit
    pub warning: Option<String>,
}

impl LoadOutcome {
    fn from_cache(cached: CachedSnapshot, warning: Option<String>) -> Self {
        Self {
            snapshot: cached.snapshot,
            source: SnapshotSource::Cache,
            updated_at: cached.cached_at,
            warning,
        }
    }
}

/// User-visible failure of a load
#[derive(Debug, Error)]
pub enum LoadError {
    /// API key or site ID missing
    #[error("Please configure your API key and Site ID in settings.")]
    Configuration,

    /// A mandatory query failed and no fallback applied
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl LoadError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LoadError::Api(e) if e.is_rate_limited())
    }

    /// Text shown to the user for this failure
    pub fn user_message(&self) -> String {
        match self {
            LoadError::Configuration => self.to_string(),
            LoadError::Api(e) => format!("Failed to load data: {}", e),
        }
    }
}

/// Orchestrates cache reads, remote fetches and fallbacks
pub struct RefreshPolicy {
    api: Arc<dyn SiteApi>,
    cache: Option<SnapshotCache>,
    /// Period of the scheduled trigger, quoted in rate-limit warnings
    refresh_minutes: u64,
    in_flight: Mutex<()>,
}

impl RefreshPolicy {
    /// Creates a policy; without a cache every load goes to the network
    pub fn new(api: Arc<dyn SiteApi>, cache: Option<SnapshotCache>) -> Self {
        Self {
            api,
            cache,
            refresh_minutes: DEFAULT_REFRESH_MINUTES,
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_refresh_minutes(mut self, minutes: u64) -> Self {
        self.refresh_minutes = minutes;
        self
    }

    pub fn cache(&self) -> Option<&SnapshotCache> {
        self.cache.as_ref()
    }

    /// Produces a snapshot for `trigger`
    ///
    /// - No credentials: fails with [`LoadError::Configuration`] before any I/O.
    /// - Non-manual triggers serve a fresh cache entry when there is one.
    /// - Otherwise all queries are issued; on success the snapshot is cached.
    /// - A rate-limited fetch falls back to a *fresh* cache entry with a warning.
    /// - Any other failure is returned as is.
    pub async fn load(
        &self,
        trigger: Trigger,
        credentials: Option<&Credentials>,
    ) -> Result<LoadOutcome, LoadError> {
        let Some(credentials) = credentials else {
            warn!(?trigger, "load skipped, credentials missing");
            return Err(LoadError::Configuration);
        };

        let _guard = self.in_flight.lock().await;
        debug!(?trigger, "load started");

        if !trigger.bypasses_cache() {
            if let Some(cached) = self.read_fresh() {
                info!(?trigger, cached_at = %cached.cached_at, "serving cached snapshot");
                return Ok(LoadOutcome::from_cache(cached, None));
            }
        }

        match self.fetch_snapshot(credentials).await {
            Ok(snapshot) => {
                let updated_at = self.store(&snapshot);
                info!(?trigger, "fetched fresh snapshot");
                Ok(LoadOutcome {
                    snapshot,
                    source: SnapshotSource::Remote,
                    updated_at,
                    warning: None,
                })
            }
            Err(err) if err.is_rate_limited() => match self.read_fresh() {
                Some(cached) => {
                    warn!(?trigger, "rate limited, falling back to cached snapshot");
                    Ok(LoadOutcome::from_cache(cached, Some(self.rate_limit_warning())))
                }
                None => {
                    warn!(?trigger, "rate limited and no fresh snapshot cached");
                    Err(err.into())
                }
            },
            Err(err) => {
                warn!(?trigger, error = %err, "load failed");
                Err(err.into())
            }
        }
    }

    fn rate_limit_warning(&self) -> String {
        format!(
            "Rate limited, showing cached data. Next update in {} minutes.",
            self.refresh_minutes
        )
    }

    /// Fresh cache entry, with storage errors treated as a miss
    fn read_fresh(&self) -> Option<CachedSnapshot> {
        let cache = self.cache.as_ref()?;
        match cache.read() {
            Ok(cached) => cached,
            Err(e) => {
                warn!(error = %e, "snapshot cache unreadable, treating as empty");
                None
            }
        }
    }

    /// Writes the snapshot; a failed write is logged and otherwise ignored
    fn store(&self, snapshot: &Snapshot) -> DateTime<Utc> {
        let Some(cache) = self.cache.as_ref() else {
            return snapshot.fetched_at;
        };
        match cache.write(snapshot) {
            Ok(written_at) => written_at,
            Err(e) => {
                warn!(error = %e, "failed to cache snapshot");
                snapshot.fetched_at
            }
        }
    }

    /// Issues every query for one snapshot
    ///
    /// The three mandatory queries are joined and fail together; the overview
    /// runs alongside them and its failure only means today's energy gets
    /// derived from the quarter-hour series later.
    async fn fetch_snapshot(&self, credentials: &Credentials) -> Result<Snapshot, ApiError> {
        let today = Local::now().date_naive();
        let window_start = today - Duration::days(DAILY_WINDOW_DAYS);

        let mandatory = futures::future::try_join3(
            self.api.fetch_current_power(credentials),
            self.api
                .fetch_energy_series(credentials, today, today, Resolution::QuarterHour),
            self.api
                .fetch_energy_series(credentials, window_start, today, Resolution::Day),
        );
        let overview = self.api.fetch_overview(credentials);

        let (mandatory, overview) = futures::join!(mandatory, overview);
        let (power_flow, intraday_energy, daily_energy) = mandatory?;

        let overview_energy_wh = match overview {
            Ok(body) => {
                let energy = extract_today_energy_wh(&body);
                if energy.is_none() {
                    debug!("overview has no recognised energy field");
                }
                energy
            }
            Err(e) => {
                debug!(error = %e, "overview unavailable, today's energy will be derived");
                None
            }
        };

        Ok(Snapshot {
            power_flow,
            intraday_energy,
            overview_energy_wh,
            daily_energy,
            fetched_at: Utc::now(),
        })
    }
}
