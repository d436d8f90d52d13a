//! Deviation of a current reading from a historical baseline.
//!
//! Per-metric z-scores against the population mean/stddev of the supplied
//! series; the level follows the maximum absolute z-score.

use std::collections::BTreeMap;

use common::{Error, Metric, Result, RiskLevel, RiskReport, WeatherMetrics};

#[derive(Debug, Clone, Default)]
pub struct HistoricalPatternAnalyzer;

impl HistoricalPatternAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Compare `current` against `history`. Fails with
    /// `InsufficientHistory` below 2 points — the standard deviation is
    /// undefined there.
    pub fn analyze_against_historical(
        &self,
        current: &WeatherMetrics,
        history: &[WeatherMetrics],
    ) -> Result<RiskReport> {
        if history.len() < 2 {
            return Err(Error::InsufficientHistory {
                points: history.len(),
            });
        }

        let mut z_scores = BTreeMap::new();
        let mut triggers = Vec::new();
        let mut max_abs_z: f64 = 0.0;

        for metric in Metric::ALL {
            let values: Vec<f64> = history.iter().map(|m| metric.value_in(m)).collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let variance =
                values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            let std_dev = variance.sqrt();

            // A flat series carries no deviation signal for this metric.
            let z = if std_dev > 0.0 {
                (metric.value_in(current) - mean) / std_dev
            } else {
                0.0
            };

            if z.abs() >= 2.0 {
                triggers.push(format!("{}_deviation", metric.name()));
            }
            max_abs_z = max_abs_z.max(z.abs());
            z_scores.insert(metric.name().to_string(), serde_json::json!(z));
        }

        let level = if max_abs_z < 1.0 {
            RiskLevel::Low
        } else if max_abs_z < 2.0 {
            RiskLevel::Moderate
        } else if max_abs_z < 3.0 {
            RiskLevel::High
        } else {
            RiskLevel::Severe
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("z_scores".into(), serde_json::json!(z_scores));
        metadata.insert("history_points".into(), serde_json::json!(history.len()));

        Ok(RiskReport {
            level,
            score: max_abs_z,
            triggers,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(rainfall: f64) -> WeatherMetrics {
        WeatherMetrics {
            rainfall,
            temperature: 26.0,
            humidity: 77.0,
            wind_speed: 10.0,
            pressure: 1013.0,
        }
    }

    #[test]
    fn test_near_mean_reading_is_low() {
        // Rainfall 20 vs {10, 30, 25}: mean ≈ 21.67, population σ ≈ 8.5,
        // |z| ≈ 0.2.
        let analyzer = HistoricalPatternAnalyzer::new();
        let history = vec![flat(10.0), flat(30.0), flat(25.0)];

        let report = analyzer
            .analyze_against_historical(&flat(20.0), &history)
            .unwrap();

        assert_eq!(report.level, RiskLevel::Low);
        assert!(report.score < 1.0);
        assert!(report.triggers.is_empty());
    }

    #[test]
    fn test_extreme_reading_escalates() {
        let analyzer = HistoricalPatternAnalyzer::new();
        let history = vec![flat(10.0), flat(30.0), flat(25.0)];

        // Rainfall 60 vs mean 21.67, σ ≈ 8.5 → z ≈ 4.5 → SEVERE.
        let report = analyzer
            .analyze_against_historical(&flat(60.0), &history)
            .unwrap();

        assert_eq!(report.level, RiskLevel::Severe);
        assert_eq!(report.triggers, vec!["rainfall_deviation"]);
        assert!(report.score > 3.0);
    }

    #[test]
    fn test_fewer_than_two_points_is_an_error() {
        let analyzer = HistoricalPatternAnalyzer::new();

        let err = analyzer
            .analyze_against_historical(&flat(20.0), &[flat(10.0)])
            .unwrap_err();
        match err {
            Error::InsufficientHistory { points } => assert_eq!(points, 1),
            other => panic!("expected InsufficientHistory, got {other:?}"),
        }

        assert!(analyzer
            .analyze_against_historical(&flat(20.0), &[])
            .is_err());
    }

    #[test]
    fn test_constant_series_yields_zero_deviation() {
        let analyzer = HistoricalPatternAnalyzer::new();
        let history = vec![flat(15.0), flat(15.0), flat(15.0)];

        let report = analyzer
            .analyze_against_historical(&flat(15.0), &history)
            .unwrap();

        assert_eq!(report.level, RiskLevel::Low);
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn test_level_bands_match_z_magnitude() {
        let analyzer = HistoricalPatternAnalyzer::new();
        // Temperature history with mean 25 and population σ = 2.
        let mut history = vec![flat(20.0); 2];
        history[0].temperature = 23.0;
        history[1].temperature = 27.0;

        let mut current = flat(20.0);
        for (temperature, expected) in [
            (26.0, RiskLevel::Low),      // z = 0.5
            (28.0, RiskLevel::Moderate), // z = 1.5
            (30.0, RiskLevel::High),     // z = 2.5
            (33.0, RiskLevel::Severe),   // z = 4.0
        ] {
            current.temperature = temperature;
            let report = analyzer
                .analyze_against_historical(&current, &history)
                .unwrap();
            assert_eq!(report.level, expected, "temperature {temperature}");
        }
    }
}
