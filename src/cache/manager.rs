//! Single-slot snapshot cache persisted to disk
//!
//! Provides a `SnapshotCache` that stores the last successfully fetched
//! [`Snapshot`] as one JSON file together with the time it was written.
//! Expiry is lazy: an entry older than the freshness window is simply reported
//! as absent on read, nothing is evicted in the background.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::config::DEFAULT_CACHE_EXPIRY_MINUTES;
use crate::data::Snapshot;

/// File name of the single cache slot
const SNAPSHOT_FILE: &str = "snapshot.json";

/// Errors that can occur when reading or writing the cache slot
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error
    #[error("Cache I/O error: {0}")]
    Io(#[from] io::Error),

    /// The entry could not be encoded, or the stored file is corrupt
    #[error("Cache entry could not be encoded or decoded: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No cache directory could be determined (e.g. no home directory)
    #[error("No cache directory available")]
    Unavailable,
}

/// On-disk layout of the slot
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// When the snapshot was written
    timestamp: DateTime<Utc>,
    /// The cached snapshot
    data: T,
}

/// A fresh snapshot read back from the cache
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSnapshot {
    pub snapshot: Snapshot,
    /// When the snapshot was written to the cache
    pub cached_at: DateTime<Utc>,
}

/// Holds at most one snapshot in an XDG-compliant cache directory
///
/// The slot lives at `~/.cache/solarpeek/snapshot.json` on Linux. Writes go
/// to a temporary file that is renamed over the slot, so readers only ever see
/// a complete entry.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    /// Directory where the slot is stored
    cache_dir: PathBuf,
    /// How long an entry stays fresh
    expiry: Duration,
}

impl SnapshotCache {
    /// Creates a cache in the XDG cache directory with the default 15 minute window
    ///
    /// Returns `None` if the cache directory cannot be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "solarpeek")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a cache in a custom directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            expiry: Duration::minutes(DEFAULT_CACHE_EXPIRY_MINUTES as i64),
        }
    }

    /// Replaces the freshness window
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path of the slot file
    fn slot_path(&self) -> PathBuf {
        self.cache_dir.join(SNAPSHOT_FILE)
    }

    /// Reads the slot, returning the snapshot only while it is fresh
    pub fn read(&self) -> Result<Option<CachedSnapshot>, StorageError> {
        self.read_at(Utc::now())
    }

    /// Reads the slot as of `now`
    ///
    /// An entry is fresh iff `now - timestamp < expiry`. A missing slot is
    /// `Ok(None)`; an unreadable or corrupt one is an error.
    pub fn read_at(&self, now: DateTime<Utc>) -> Result<Option<CachedSnapshot>, StorageError> {
        let content = match fs::read_to_string(self.slot_path()) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("snapshot cache empty");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let entry: CacheEntry<Snapshot> = serde_json::from_str(&content)?;

        let age = now.signed_duration_since(entry.timestamp);
        if age >= self.expiry {
            debug!(age_secs = age.num_seconds(), "snapshot cache expired");
            return Ok(None);
        }

        Ok(Some(CachedSnapshot {
            snapshot: entry.data,
            cached_at: entry.timestamp,
        }))
    }

    /// Replaces the slot with `snapshot`, stamped with the current time
    pub fn write(&self, snapshot: &Snapshot) -> Result<DateTime<Utc>, StorageError> {
        self.write_at(snapshot, Utc::now())
    }

    /// Replaces the slot with `snapshot`, stamped with `now`
    pub fn write_at(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Result<DateTime<Utc>, StorageError> {
        fs::create_dir_all(&self.cache_dir)?;

        let entry = CacheEntry {
            timestamp: now,
            data: snapshot,
        };
        let json = serde_json::to_string_pretty(&entry)?;

        let tmp = self
            .cache_dir
            .join(format!("{}.{}.tmp", SNAPSHOT_FILE, std::process::id()));
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, self.slot_path()) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(timestamp = %now, "snapshot cached");
        Ok(now)
    }

    /// Empties the slot; clearing an empty slot is not an error
    pub fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(self.slot_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PowerFlowResponse, SeriesSample, TimeSeries};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn create_test_cache() -> (SnapshotCache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = SnapshotCache::with_dir(temp_dir.path().to_path_buf());
        (cache, temp_dir)
    }

    fn snapshot(overview_wh: Option<f64>) -> Snapshot {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 15, 0)
            .unwrap();
        Snapshot {
            power_flow: PowerFlowResponse::default(),
            intraday_energy: TimeSeries {
                time_unit: Some("QUARTER_OF_AN_HOUR".to_string()),
                unit: Some("Wh".to_string()),
                values: vec![
                    SeriesSample { date, value: Some(120.0) },
                    SeriesSample { date, value: None },
                ],
            },
            overview_energy_wh: overview_wh,
            daily_energy: TimeSeries::default(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_write_creates_slot_file() {
        let (cache, temp_dir) = create_test_cache();

        cache.write(&snapshot(None)).expect("Write should succeed");

        let path = temp_dir.path().join(SNAPSHOT_FILE);
        assert!(path.exists(), "Slot file should exist");
        let content = fs::read_to_string(&path).expect("Should read file");
        assert!(content.contains("\"timestamp\""));
        assert!(content.contains("\"data\""));
    }

    #[test]
    fn test_read_returns_none_for_empty_slot() {
        let (cache, _temp_dir) = create_test_cache();
        assert!(cache.read().expect("Read should succeed").is_none());
    }

    #[test]
    fn test_fresh_entry_roundtrips_unchanged() {
        let (cache, _temp_dir) = create_test_cache();
        let original = snapshot(Some(1500.0));

        let written_at = cache.write(&original).expect("Write should succeed");
        let cached = cache.read().expect("Read should succeed").expect("Entry should be fresh");

        assert_eq!(cached.snapshot, original);
        assert_eq!(cached.cached_at, written_at);
    }

    #[test]
    fn test_entry_just_inside_window_is_fresh() {
        let (cache, _temp_dir) = create_test_cache();
        let now = Utc::now();
        cache
            .write_at(&snapshot(None), now - Duration::minutes(15) + Duration::seconds(1))
            .unwrap();

        assert!(cache.read_at(now).unwrap().is_some());
    }

    #[test]
    fn test_entry_at_window_boundary_is_absent() {
        let (cache, _temp_dir) = create_test_cache();
        let now = Utc::now();
        cache.write_at(&snapshot(None), now - Duration::minutes(15)).unwrap();

        assert!(cache.read_at(now).unwrap().is_none());
    }

    #[test]
    fn test_old_entry_is_absent() {
        let (cache, _temp_dir) = create_test_cache();
        let now = Utc::now();
        cache.write_at(&snapshot(None), now - Duration::hours(3)).unwrap();

        assert!(cache.read_at(now).unwrap().is_none());
    }

    #[test]
    fn test_custom_expiry() {
        let (cache, _temp_dir) = create_test_cache();
        let cache = cache.with_expiry(Duration::minutes(60));
        let now = Utc::now();
        cache.write_at(&snapshot(None), now - Duration::minutes(30)).unwrap();

        assert_eq!(cache.expiry(), Duration::minutes(60));
        assert!(cache.read_at(now).unwrap().is_some());
    }

    #[test]
    fn test_overwrite_replaces_whole_entry() {
        let (cache, _temp_dir) = create_test_cache();
        let first = snapshot(Some(1.0));
        let second = snapshot(None);

        cache.write(&first).unwrap();
        cache.write(&second).unwrap();

        let cached = cache.read().unwrap().unwrap();
        assert_eq!(cached.snapshot, second);
    }

    #[test]
    fn test_corrupt_slot_is_storage_error() {
        let (cache, temp_dir) = create_test_cache();
        fs::write(temp_dir.path().join(SNAPSHOT_FILE), "{ not json").unwrap();

        assert!(matches!(cache.read(), Err(StorageError::Serialize(_))));
    }

    #[test]
    fn test_clear_empties_slot() {
        let (cache, _temp_dir) = create_test_cache();
        cache.write(&snapshot(None)).unwrap();

        cache.clear().expect("Clear should succeed");
        assert!(cache.read().unwrap().is_none());

        cache.clear().expect("Clearing an empty slot should succeed");
    }

    #[test]
    fn test_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("cache");
        let cache = SnapshotCache::with_dir(nested_path.clone());

        cache.write(&snapshot(None)).expect("Write should succeed");

        assert!(nested_path.join(SNAPSHOT_FILE).exists());
        assert_eq!(cache.dir(), nested_path.as_path());
    }

    #[test]
    fn test_no_temporary_files_left_behind() {
        let (cache, temp_dir) = create_test_cache();
        cache.write(&snapshot(None)).unwrap();

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(cache) = SnapshotCache::new() {
            let path_str = cache.cache_dir.to_string_lossy();
            assert!(path_str.contains("solarpeek"), "Cache path should contain project name");
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}
