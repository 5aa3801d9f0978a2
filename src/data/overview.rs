//! Extraction of "today's energy" from the overview endpoint
//!
//! The overview response has been seen in several nestings. Each known nesting
//! is an [`OverviewShape`]; shapes are tried in [`OVERVIEW_SHAPES`] order and
//! the first one that yields a finite number wins. None of them is treated as
//! authoritative, so supporting a new nesting means adding a variant and
//! listing it, without touching the callers.

use serde_json::Value;
use tracing::debug;

/// A known location of the day's energy figure inside an overview response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverviewShape {
    /// `{"overview": {"lastDayData": {"energy": 1234.0}}}`
    Nested,
    /// `{"lastDayData": {"energy": 1234.0}}`
    Unwrapped,
    /// `{"overview": {"lastDayData": 1234.0}}`
    Flattened,
}

/// Shapes in the order they are tried
pub const OVERVIEW_SHAPES: [OverviewShape; 3] = [
    OverviewShape::Nested,
    OverviewShape::Unwrapped,
    OverviewShape::Flattened,
];

impl OverviewShape {
    fn pointer(self) -> &'static str {
        match self {
            OverviewShape::Nested => "/overview/lastDayData/energy",
            OverviewShape::Unwrapped => "/lastDayData/energy",
            OverviewShape::Flattened => "/overview/lastDayData",
        }
    }

    /// Returns the day's energy in Wh if `body` has this shape
    pub fn extract(self, body: &Value) -> Option<f64> {
        body.pointer(self.pointer()).and_then(as_number)
    }
}

/// Numbers occasionally arrive as strings
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Returns today's energy in Wh from the first matching shape
pub fn extract_today_energy_wh(body: &Value) -> Option<f64> {
    OVERVIEW_SHAPES.iter().find_map(|shape| {
        let energy = shape.extract(body)?;
        debug!(?shape, energy, "overview energy extracted");
        Some(energy)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_shape() {
        let body = json!({"overview": {"lastUpdateTime": "2024-06-01 12:00:00", "lastDayData": {"energy": 15200.0}}});
        assert_eq!(extract_today_energy_wh(&body), Some(15200.0));
        assert_eq!(OverviewShape::Nested.extract(&body), Some(15200.0));
        assert_eq!(OverviewShape::Unwrapped.extract(&body), None);
    }

    #[test]
    fn test_unwrapped_shape() {
        let body = json!({"lastDayData": {"energy": 800}});
        assert_eq!(extract_today_energy_wh(&body), Some(800.0));
    }

    #[test]
    fn test_flattened_shape() {
        let body = json!({"overview": {"lastDayData": 42.5}});
        assert_eq!(extract_today_energy_wh(&body), Some(42.5));
    }

    #[test]
    fn test_string_number_accepted() {
        let body = json!({"overview": {"lastDayData": {"energy": " 1234.5 "}}});
        assert_eq!(extract_today_energy_wh(&body), Some(1234.5));
    }

    #[test]
    fn test_first_matching_shape_wins() {
        let body = json!({
            "overview": {"lastDayData": {"energy": 1.0}},
            "lastDayData": {"energy": 2.0}
        });
        assert_eq!(extract_today_energy_wh(&body), Some(1.0));
    }

    #[test]
    fn test_falls_through_non_numeric_values() {
        let body = json!({
            "overview": {"lastDayData": {"energy": null}},
            "lastDayData": {"energy": 3.0}
        });
        assert_eq!(extract_today_energy_wh(&body), Some(3.0));
    }

    #[test]
    fn test_unknown_shape_yields_none() {
        assert_eq!(extract_today_energy_wh(&json!({"sites": []})), None);
        assert_eq!(extract_today_energy_wh(&json!({"overview": {"lastDayData": {"energy": "n/a"}}})), None);
        assert_eq!(extract_today_energy_wh(&Value::Null), None);
    }
}
