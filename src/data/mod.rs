//! Core data models for solarpeek
//!
//! This module contains the types returned by the SolarEdge monitoring API and
//! the [`Snapshot`] that bundles one complete fetch cycle.

pub mod metrics;
pub mod overview;
pub mod solaredge;

pub use metrics::{ChartPoint, DashboardMetrics, EnergySource};
pub use overview::{extract_today_energy_wh, OverviewShape};
pub use solaredge::{ApiError, RemoteErrorKind, SiteApi, SolarEdgeClient};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp format used by the API for series samples and time-range queries
pub const VENDOR_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Calendar date format used by the API for date-range queries
pub const VENDOR_DATE_FORMAT: &str = "%Y-%m-%d";

/// Envelope of the `currentPowerFlow.json` endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerFlowResponse {
    #[serde(rename = "siteCurrentPowerFlow")]
    pub site_current_power_flow: Option<PowerFlow>,
}

/// Instantaneous power flow between the site's PV array, grid and load
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerFlow {
    /// Power unit for every node below ("W" or "kW")
    pub unit: Option<String>,
    /// Seconds between updates as advertised by the API
    pub update_refresh_rate: Option<u32>,
    #[serde(rename = "PV")]
    pub pv: Option<FlowNode>,
    #[serde(rename = "GRID")]
    pub grid: Option<FlowNode>,
    #[serde(rename = "LOAD")]
    pub load: Option<FlowNode>,
}

/// One node of the power flow diagram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub status: Option<String>,
    pub current_power: Option<f64>,
}

/// Envelope of the `power` endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PowerSeriesResponse {
    #[serde(default)]
    pub power: TimeSeries,
}

/// Envelope of the `energy` endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct EnergySeriesResponse {
    #[serde(default)]
    pub energy: TimeSeries,
}

/// A time series as returned by the `power` and `energy` endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    /// Resolution reported by the API (e.g. "DAY", "QUARTER_OF_AN_HOUR")
    pub time_unit: Option<String>,
    /// Unit of every sample ("W" for power, "Wh" for energy)
    pub unit: Option<String>,
    #[serde(default)]
    pub values: Vec<SeriesSample>,
}

/// A single sample; the API reports `null` for intervals without data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSample {
    #[serde(with = "vendor_datetime")]
    pub date: NaiveDateTime,
    pub value: Option<f64>,
}

/// Resolution of an energy query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Day,
    QuarterHour,
}

impl Resolution {
    /// Value of the `timeUnit` query parameter
    pub fn as_query_value(self) -> &'static str {
        match self {
            Resolution::Day => "DAY",
            Resolution::QuarterHour => "QUARTER_OF_AN_HOUR",
        }
    }

    /// Length of one interval in hours
    pub fn interval_hours(self) -> f64 {
        match self {
            Resolution::Day => 24.0,
            Resolution::QuarterHour => 0.25,
        }
    }
}

/// Everything needed for one render pass, replaced wholesale on every successful fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current power flow
    pub power_flow: PowerFlowResponse,
    /// Today's energy at quarter-hour resolution (Wh per interval)
    pub intraday_energy: TimeSeries,
    /// Today's energy as reported by the overview endpoint, if it answered (Wh)
    pub overview_energy_wh: Option<f64>,
    /// Daily energy for the last 30 days (Wh per day)
    pub daily_energy: TimeSeries,
    /// When the fetch completed
    pub fetched_at: DateTime<Utc>,
}

/// Serde adapter for the API's `YYYY-MM-DD HH:MM:SS` timestamps
mod vendor_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::VENDOR_DATETIME_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(VENDOR_DATETIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, VENDOR_DATETIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_power_flow() {
        let json = r#"{
            "siteCurrentPowerFlow": {
                "updateRefreshRate": 3,
                "unit": "kW",
                "connections": [{"from": "PV", "to": "Load"}],
                "GRID": {"status": "Active", "currentPower": 0.4},
                "LOAD": {"status": "Active", "currentPower": 1.2},
                "PV": {"status": "Active", "currentPower": 3.61}
            }
        }"#;

        let response: PowerFlowResponse = serde_json::from_str(json).expect("Should parse");
        let flow = response.site_current_power_flow.expect("flow present");
        assert_eq!(flow.unit.as_deref(), Some("kW"));
        assert_eq!(flow.update_refresh_rate, Some(3));
        assert_eq!(flow.pv.and_then(|pv| pv.current_power), Some(3.61));
    }

    #[test]
    fn test_parse_power_flow_without_pv() {
        let response: PowerFlowResponse =
            serde_json::from_str(r#"{"siteCurrentPowerFlow": {"unit": "W"}}"#).expect("Should parse");
        assert!(response.site_current_power_flow.unwrap().pv.is_none());
    }

    #[test]
    fn test_parse_energy_series_with_nulls() {
        let json = r#"{
            "energy": {
                "timeUnit": "QUARTER_OF_AN_HOUR",
                "unit": "Wh",
                "measuredBy": "INVERTER",
                "values": [
                    {"date": "2024-06-01 00:00:00", "value": null},
                    {"date": "2024-06-01 00:15:00", "value": 12.5},
                    {"date": "2024-06-01 00:30:00"}
                ]
            }
        }"#;

        let response: EnergySeriesResponse = serde_json::from_str(json).expect("Should parse");
        let series = response.energy;
        assert_eq!(series.time_unit.as_deref(), Some("QUARTER_OF_AN_HOUR"));
        assert_eq!(series.values.len(), 3);
        assert_eq!(series.values[0].value, None);
        assert_eq!(series.values[1].value, Some(12.5));
        assert_eq!(series.values[2].value, None);
        assert_eq!(
            series.values[1].date,
            NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(0, 15, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_missing_envelope_yields_empty_series() {
        let response: PowerSeriesResponse = serde_json::from_str("{}").expect("Should parse");
        assert!(response.power.values.is_empty());
    }

    #[test]
    fn test_invalid_sample_date_is_rejected() {
        let json = r#"{"power": {"values": [{"date": "2024-06-01T00:00:00Z", "value": 1.0}]}}"#;
        assert!(serde_json::from_str::<PowerSeriesResponse>(json).is_err());
    }

    #[test]
    fn test_sample_date_keeps_vendor_format_when_serialized() {
        let sample = SeriesSample {
            date: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(13, 45, 0)
                .unwrap(),
            value: Some(1.0),
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains("\"2024-01-02 13:45:00\""));
    }

    #[test]
    fn test_resolution_query_values() {
        assert_eq!(Resolution::Day.as_query_value(), "DAY");
        assert_eq!(Resolution::QuarterHour.as_query_value(), "QUARTER_OF_AN_HOUR");
        assert!((Resolution::QuarterHour.interval_hours() - 0.25).abs() < f64::EPSILON);
    }
}
