//! Cross-source disagreement detection.
//!
//! Works on the raw per-provider observations that fed one aggregation
//! call, never on the consensus — the spread is only visible in the
//! individual values.

use std::collections::BTreeMap;

use common::config::AnomalyConfig;
use common::{AnomalyReport, Metric, MetricAnomaly, WeatherObservation};
use tracing::debug;

pub struct AnomalyDetector {
    tolerances: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(tolerances: AnomalyConfig) -> Self {
        Self { tolerances }
    }

    /// Per-metric spread (max − min) across providers, flagged when it
    /// exceeds that metric's tolerance. With fewer than two providers no
    /// spread exists, so nothing can be flagged.
    pub fn detect(&self, observations: &[WeatherObservation]) -> AnomalyReport {
        let mut per_metric = BTreeMap::new();

        for metric in Metric::ALL {
            let provider_values: BTreeMap<String, f64> = observations
                .iter()
                .map(|o| (o.source.clone(), metric.value_in(&o.metrics)))
                .collect();

            let spread = if provider_values.len() < 2 {
                0.0
            } else {
                let max = provider_values
                    .values()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max);
                let min = provider_values
                    .values()
                    .copied()
                    .fold(f64::INFINITY, f64::min);
                max - min
            };

            let flagged = spread > self.tolerances.tolerance_for(metric);
            if flagged {
                debug!(
                    "{} disagreement: spread {:.3} exceeds tolerance {:.3}",
                    metric.name(),
                    spread,
                    self.tolerances.tolerance_for(metric)
                );
            }

            per_metric.insert(
                metric.name().to_string(),
                MetricAnomaly {
                    provider_values,
                    spread,
                    flagged,
                },
            );
        }

        AnomalyReport { per_metric }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{GeoLocation, WeatherMetrics};

    fn observation(source: &str, temperature: f64) -> WeatherObservation {
        WeatherObservation {
            timestamp_ms: 1_755_000_000_000,
            location: GeoLocation::new(-1.2921, 36.8219).unwrap(),
            metrics: WeatherMetrics {
                rainfall: 0.0,
                temperature,
                humidity: 80.0,
                wind_speed: 5.0,
                pressure: 1015.0,
            },
            confidence: 0.9,
            source: source.to_string(),
        }
    }

    fn detector_with_temp_tolerance(tolerance: f64) -> AnomalyDetector {
        AnomalyDetector::new(AnomalyConfig {
            temperature_tolerance_c: tolerance,
            ..AnomalyConfig::default()
        })
    }

    #[test]
    fn test_spread_beyond_tolerance_is_flagged() {
        let detector = detector_with_temp_tolerance(1.5);
        let report = detector.detect(&[
            observation("A", 10.0),
            observation("B", 12.0),
            observation("C", 11.0),
        ]);

        let temp = &report.per_metric["temperature"];
        assert!((temp.spread - 2.0).abs() < 1e-9);
        assert!(temp.flagged);
        assert_eq!(temp.provider_values.len(), 3);
        assert_eq!(report.flagged_metrics(), vec!["temperature"]);
    }

    #[test]
    fn test_spread_within_tolerance_is_not_flagged() {
        let detector = detector_with_temp_tolerance(1.5);
        let report = detector.detect(&[
            observation("A", 10.0),
            observation("B", 10.5),
            observation("C", 10.2),
        ]);

        let temp = &report.per_metric["temperature"];
        assert!((temp.spread - 0.5).abs() < 1e-9);
        assert!(!temp.flagged);
    }

    #[test]
    fn test_single_provider_cannot_flag() {
        let detector = detector_with_temp_tolerance(0.1);
        let report = detector.detect(&[observation("A", 35.0)]);

        assert!(report.flagged_metrics().is_empty());
        assert_eq!(report.per_metric["temperature"].spread, 0.0);
    }

    #[test]
    fn test_empty_input_yields_empty_unflagged_report() {
        let detector = detector_with_temp_tolerance(1.5);
        let report = detector.detect(&[]);

        assert_eq!(report.per_metric.len(), 5);
        assert!(report.flagged_metrics().is_empty());
    }
}
