//! solarpeek library
//!
//! This module exposes the data, cache, refresh and CLI modules for use by the
//! binary and by integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod refresh;
