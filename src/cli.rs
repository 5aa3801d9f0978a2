//! Command-line interface parsing for solarpeek
//!
//! This module handles parsing of CLI arguments using clap. Without a
//! subcommand the interactive dashboard starts; subcommands run once and exit.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

/// Longest window accepted by the `power` command, in hours
pub const MAX_POWER_HOURS: u32 = 168;

/// Error types for CLI argument validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// The power window is out of range
    #[error("Invalid hours: {0}. Expected a value between 1 and 168")]
    InvalidHours(u32),

    /// A credential flag was given but left blank
    #[error("--{0} must not be empty")]
    EmptyValue(&'static str),

    /// `configure` needs both credentials
    #[error("Please fill in all fields: configure requires --api-key and --site-id")]
    MissingCredentials,
}

/// solarpeek - SolarEdge site dashboard
#[derive(Parser, Debug)]
#[command(name = "solarpeek")]
#[command(about = "SolarEdge site dashboard: current power, today's energy and the last 30 days")]
#[command(version)]
pub struct Cli {
    /// API key to use instead of the stored one
    #[arg(long, global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Site ID to use instead of the stored one
    #[arg(long, global = true, value_name = "ID")]
    pub site_id: Option<String>,

    /// Settings file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

/// One-shot commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Print current power and today's energy, then exit
    Status {
        /// Fetch fresh data even if the cache is fresh
        #[arg(long)]
        force: bool,
        /// Print the metrics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the power series for the last N hours
    Power {
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
    /// Store the API key and site ID given with --api-key/--site-id
    Configure {
        /// Save without testing the connection first
        #[arg(long)]
        skip_test: bool,
    },
    /// Check that the credentials can reach the site
    TestConnection,
    /// Remove the cached snapshot
    ClearCache,
}

/// What the binary should do, after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dashboard,
    Status { force: bool, json: bool },
    Power { hours: u32 },
    Configure { api_key: String, site_id: String, skip_test: bool },
    TestConnection,
    ClearCache,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupConfig {
    pub command: Command,
    /// API key override for this run
    pub api_key: Option<String>,
    /// Site ID override for this run
    pub site_id: Option<String>,
    /// Settings file override
    pub settings_path: Option<PathBuf>,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            command: Command::Dashboard,
            api_key: None,
            site_id: None,
            settings_path: None,
        }
    }
}

/// Trims a credential flag, rejecting blank values
fn credential_arg(value: Option<&String>, flag: &'static str) -> Result<Option<String>, CliError> {
    match value.map(|v| v.trim()) {
        None => Ok(None),
        Some("") => Err(CliError::EmptyValue(flag)),
        Some(v) => Ok(Some(v.to_string())),
    }
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with the resolved command and overrides
    /// * `Err(CliError)` if an argument is out of range or blank
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let api_key = credential_arg(cli.api_key.as_ref(), "api-key")?;
        let site_id = credential_arg(cli.site_id.as_ref(), "site-id")?;

        let command = match &cli.command {
            None => Command::Dashboard,
            Some(CliCommand::Status { force, json }) => Command::Status {
                force: *force,
                json: *json,
            },
            Some(CliCommand::Power { hours }) => {
                if *hours == 0 || *hours > MAX_POWER_HOURS {
                    return Err(CliError::InvalidHours(*hours));
                }
                Command::Power { hours: *hours }
            }
            Some(CliCommand::Configure { skip_test }) => match (&api_key, &site_id) {
                (Some(api_key), Some(site_id)) => Command::Configure {
                    api_key: api_key.clone(),
                    site_id: site_id.clone(),
                    skip_test: *skip_test,
                },
                _ => return Err(CliError::MissingCredentials),
            },
            Some(CliCommand::TestConnection) => Command::TestConnection,
            Some(CliCommand::ClearCache) => Command::ClearCache,
        };

        Ok(StartupConfig {
            command,
            api_key,
            site_id,
            settings_path: cli.config.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args_is_dashboard() {
        let cli = Cli::parse_from(["solarpeek"]);
        assert!(cli.command.is_none());
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config, StartupConfig::default());
    }

    #[test]
    fn test_status_flags() {
        let cli = Cli::parse_from(["solarpeek", "status", "--force", "--json"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.command, Command::Status { force: true, json: true });
    }

    #[test]
    fn test_power_default_hours() {
        let cli = Cli::parse_from(["solarpeek", "power"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.command, Command::Power { hours: 24 });
    }

    #[test]
    fn test_power_hours_out_of_range() {
        let cli = Cli::parse_from(["solarpeek", "power", "--hours", "0"]);
        assert_eq!(StartupConfig::from_cli(&cli), Err(CliError::InvalidHours(0)));

        let cli = Cli::parse_from(["solarpeek", "power", "--hours", "169"]);
        assert_eq!(StartupConfig::from_cli(&cli), Err(CliError::InvalidHours(169)));
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::parse_from(["solarpeek", "status", "--api-key", " k ", "--site-id", "9"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.site_id.as_deref(), Some("9"));
    }

    #[test]
    fn test_blank_override_rejected() {
        let cli = Cli::parse_from(["solarpeek", "--api-key", "  "]);
        assert_eq!(
            StartupConfig::from_cli(&cli),
            Err(CliError::EmptyValue("api-key"))
        );
    }

    #[test]
    fn test_configure_requires_both_credentials() {
        let cli = Cli::parse_from(["solarpeek", "configure", "--api-key", "k"]);
        assert_eq!(StartupConfig::from_cli(&cli), Err(CliError::MissingCredentials));
    }

    #[test]
    fn test_configure_with_credentials() {
        let cli = Cli::parse_from([
            "solarpeek", "configure", "--api-key", "k", "--site-id", "1", "--skip-test",
        ]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(
            config.command,
            Command::Configure {
                api_key: "k".to_string(),
                site_id: "1".to_string(),
                skip_test: true
            }
        );
    }

    #[test]
    fn test_config_path_override() {
        let cli = Cli::parse_from(["solarpeek", "clear-cache", "--config", "/tmp/s.toml"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.command, Command::ClearCache);
        assert_eq!(config.settings_path, Some(PathBuf::from("/tmp/s.toml")));
    }
}
