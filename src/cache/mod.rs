//! Cache module for the last fetched snapshot
//!
//! This module provides a single-slot cache that persists the most recent
//! [`Snapshot`](crate::data::Snapshot) to the filesystem. Entries are only
//! served while younger than the freshness window (15 minutes by default);
//! stale entries are reported as absent rather than handed out.

mod manager;

pub use manager::{CachedSnapshot, SnapshotCache, StorageError};
