//! Data refresh system
//!
//! The [`RefreshPolicy`] decides, per load, whether to serve the cached
//! snapshot or go to the network and how to degrade when the API fails. The
//! [`RefreshHandle`] produces the triggers that start those loads.

mod policy;
mod scheduler;

pub use policy::{LoadError, LoadOutcome, RefreshPolicy, SnapshotSource, Trigger, DAILY_WINDOW_DAYS};
pub use scheduler::{try_recv, RefreshConfig, RefreshHandle};
