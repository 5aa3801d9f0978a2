//! Derived metrics handed to the presentation layer
//!
//! Converts a [`Snapshot`] into the scalars and labelled series the dashboard
//! and the `status` command display. Nothing here touches the network or cache.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{PowerFlowResponse, Resolution, Snapshot, TimeSeries};

/// Where today's energy figure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergySource {
    /// Reported by the overview endpoint
    Overview,
    /// Summed from the quarter-hour energy series
    Derived,
}

/// One labelled point of a chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Everything the presentation layer renders for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    /// PV production right now, in kW
    pub current_power_kw: f64,
    /// Energy produced today, in kWh
    pub today_energy_kwh: f64,
    pub energy_source: EnergySource,
    /// Average power per quarter hour today (kW), labelled "HH:MM"
    pub intraday: Vec<ChartPoint>,
    /// Energy per day over the last 30 days (kWh), labelled "Oct 1"
    pub daily: Vec<ChartPoint>,
    pub fetched_at: DateTime<Utc>,
}

impl DashboardMetrics {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let (today_energy_kwh, energy_source) = match snapshot.overview_energy_wh {
            Some(wh) => (wh / 1000.0, EnergySource::Overview),
            None => (
                derive_today_energy_kwh(&snapshot.intraday_energy),
                EnergySource::Derived,
            ),
        };

        Self {
            current_power_kw: current_power_kw(&snapshot.power_flow),
            today_energy_kwh,
            energy_source,
            intraday: intraday_points(&snapshot.intraday_energy, Resolution::QuarterHour),
            daily: daily_points(&snapshot.daily_energy),
            fetched_at: snapshot.fetched_at,
        }
    }
}

/// Current PV production in kW
///
/// A missing PV node counts as zero. Values are scaled by the flow's `unit`;
/// without one they are taken to be watts.
pub fn current_power_kw(flow: &PowerFlowResponse) -> f64 {
    let Some(flow) = flow.site_current_power_flow.as_ref() else {
        return 0.0;
    };
    let power = flow
        .pv
        .as_ref()
        .and_then(|pv| pv.current_power)
        .unwrap_or(0.0);

    to_kw(power, flow.unit.as_deref())
}

/// Converts a power value in `unit` (W, kW or MW; absent means W) to kW
pub fn to_kw(value: f64, unit: Option<&str>) -> f64 {
    match unit.map(str::trim) {
        Some(unit) if unit.eq_ignore_ascii_case("kw") => value,
        Some(unit) if unit.eq_ignore_ascii_case("mw") => value * 1000.0,
        _ => value / 1000.0,
    }
}

/// Today's energy in kWh from a quarter-hour energy series (Wh per interval)
///
/// Intervals without data are left out of the sum rather than counted as zero.
pub fn derive_today_energy_kwh(series: &TimeSeries) -> f64 {
    series.values.iter().filter_map(|s| s.value).sum::<f64>() / 1000.0
}

/// Average power (kW) per interval of an energy series
pub fn intraday_points(series: &TimeSeries, resolution: Resolution) -> Vec<ChartPoint> {
    let hours = resolution.interval_hours();
    series
        .values
        .iter()
        .filter_map(|sample| {
            let wh = sample.value?;
            Some(ChartPoint {
                label: sample.date.format("%H:%M").to_string(),
                value: wh / 1000.0 / hours,
            })
        })
        .collect()
}

/// Energy (kWh) per day of a daily energy series
pub fn daily_points(series: &TimeSeries) -> Vec<ChartPoint> {
    series
        .values
        .iter()
        .filter_map(|sample| {
            let wh = sample.value?;
            Some(ChartPoint {
                label: sample.date.format("%b %-d").to_string(),
                value: wh / 1000.0,
            })
        })
        .collect()
}
