//! Canonical observation and report types shared across the oracle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ── Observations ──────────────────────────────────────────────────────

/// A WGS-84 coordinate pair, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
}

impl GeoLocation {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(Error::InvalidCoordinate(format!(
                "latitude {lat} outside [-90, 90]"
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::InvalidCoordinate(format!(
                "longitude {lon} outside [-180, 180]"
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Deterministic cache-key quantization at 1e-4 degrees (≈11 m).
    /// Coordinates closer than that share a cache entry.
    pub fn grid_key(&self) -> (i64, i64) {
        (
            (self.lat * 1e4).round() as i64,
            (self.lon * 1e4).round() as i64,
        )
    }
}

/// Canonical per-observation metrics, already unit-normalized by the
/// provider adapters (mm, °C, %, km/h, hPa).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherMetrics {
    /// Rainfall accumulation in mm.
    pub rainfall: f64,
    /// Air temperature in °C.
    pub temperature: f64,
    /// Relative humidity in percent (0-100).
    pub humidity: f64,
    /// Wind speed in km/h.
    pub wind_speed: f64,
    /// Surface pressure in hPa.
    pub pressure: f64,
}

/// The five canonical metrics, usable as iteration keys by the anomaly,
/// compound-risk, and historical engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Rainfall,
    Temperature,
    Humidity,
    WindSpeed,
    Pressure,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Rainfall,
        Metric::Temperature,
        Metric::Humidity,
        Metric::WindSpeed,
        Metric::Pressure,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Rainfall => "rainfall",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::WindSpeed => "wind_speed",
            Metric::Pressure => "pressure",
        }
    }

    pub fn value_in(&self, metrics: &WeatherMetrics) -> f64 {
        match self {
            Metric::Rainfall => metrics.rainfall,
            Metric::Temperature => metrics.temperature,
            Metric::Humidity => metrics.humidity,
            Metric::WindSpeed => metrics.wind_speed,
            Metric::Pressure => metrics.pressure,
        }
    }
}

/// A single provider's normalized reading. Immutable once constructed;
/// `confidence` is the provider's self-declared data quality, not the
/// cross-source agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
    pub location: GeoLocation,
    pub metrics: WeatherMetrics,
    /// Provider-declared quality, 0-1.
    pub confidence: f64,
    pub source: String,
}

/// The aggregator's reconciled reading. `confidence` is the mean of the
/// contributing observations' confidences; cross-source disagreement is
/// surfaced separately via [`AnomalyReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusObservation {
    /// Epoch milliseconds at aggregation time.
    pub timestamp_ms: i64,
    pub location: GeoLocation,
    pub metrics: WeatherMetrics,
    pub confidence: f64,
    /// Contributing providers, in configured order.
    pub sources: Vec<String>,
}

// ── Reports ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Severe,
}

/// Output of every risk engine. Read-only once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub level: RiskLevel,
    pub score: f64,
    /// Human-readable names of whatever fired, in definition order.
    pub triggers: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Per-metric spread across the providers that fed one aggregation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAnomaly {
    /// Raw per-provider values, kept for debuggability.
    pub provider_values: BTreeMap<String, f64>,
    /// max(values) − min(values); 0 with fewer than two providers.
    pub spread: f64,
    pub flagged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub per_metric: BTreeMap<String, MetricAnomaly>,
}

impl AnomalyReport {
    /// Names of metrics whose spread exceeded tolerance.
    pub fn flagged_metrics(&self) -> Vec<&str> {
        self.per_metric
            .iter()
            .filter(|(_, a)| a.flagged)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_rejects_out_of_range() {
        assert!(GeoLocation::new(90.01, 0.0).is_err());
        assert!(GeoLocation::new(0.0, -180.5).is_err());
        assert!(GeoLocation::new(f64::NAN, 0.0).is_err());
        assert!(GeoLocation::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_grid_key_quantizes_nearby_coordinates() {
        let a = GeoLocation::new(40.71280, -74.00601).unwrap();
        let b = GeoLocation::new(40.71281, -74.00604).unwrap();
        assert_eq!(a.grid_key(), b.grid_key());

        let far = GeoLocation::new(40.7258, -74.0060).unwrap();
        assert_ne!(a.grid_key(), far.grid_key());
    }

    #[test]
    fn test_consensus_round_trips_through_json() {
        let consensus = ConsensusObservation {
            timestamp_ms: 1_755_000_000_123,
            location: GeoLocation::new(-1.2921, 36.8219).unwrap(),
            metrics: WeatherMetrics {
                rainfall: 0.0133333,
                temperature: 14.9766,
                humidity: 90.3333,
                wind_speed: 2.5566,
                pressure: 957.3066,
            },
            confidence: 0.9333,
            sources: vec!["OpenWeatherMap".into(), "WeatherAPI.com".into()],
        };

        let json = serde_json::to_string(&consensus).unwrap();
        let back: ConsensusObservation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, consensus);
    }

    #[test]
    fn test_risk_report_round_trips_through_json() {
        let mut metadata = BTreeMap::new();
        metadata.insert("rainfall_mm".to_string(), serde_json::json!(20.0));

        let report = RiskReport {
            level: RiskLevel::High,
            score: 0.4167,
            triggers: vec!["rainfall_deficit".into()],
            metadata,
        };

        let json = serde_json::to_string(&report).unwrap();
        let back: RiskReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Moderate);
        assert!(RiskLevel::Moderate < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Severe);
    }
}
