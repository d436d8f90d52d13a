//! Multi-source fusion: concurrent fan-out over the configured weather
//! sources, consensus reconciliation, and cross-source anomaly detection.

pub mod anomaly;

use std::sync::Arc;

use chrono::Utc;
use common::{
    ConsensusObservation, Error, GeoLocation, Metric, Result, SourceFailure, WeatherMetrics,
    WeatherObservation,
};
use futures_util::future::join_all;
use provider_core::WeatherSource;
use tracing::{debug, warn};

pub use anomaly::AnomalyDetector;

/// One aggregation call's full result: the consensus plus the raw
/// per-provider observations the anomaly detector needs, plus whichever
/// sources failed this round.
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    pub consensus: ConsensusObservation,
    /// Successful observations, in configured source order.
    pub contributions: Vec<WeatherObservation>,
    pub failures: Vec<SourceFailure>,
}

/// Reconciles an ordered collection of weather sources into a single
/// consensus reading. Constructed explicitly with its provider list — no
/// process-wide singleton.
pub struct WeatherAggregator {
    sources: Vec<Arc<dyn WeatherSource>>,
}

impl WeatherAggregator {
    pub fn new(sources: Vec<Arc<dyn WeatherSource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Fan out to every configured source concurrently and reconcile the
    /// survivors. One source failing (or being throttled) never cancels or
    /// delays the others; all results are awaited before reconciliation.
    ///
    /// Fails with `AllSourcesFailed` only when no source succeeded, and
    /// then carries every provider's cause.
    pub async fn aggregated_weather(&self, location: GeoLocation) -> Result<AggregationOutcome> {
        let fetches = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            async move {
                let outcome = source.current_weather(location).await;
                (source.name(), outcome)
            }
        });

        let mut contributions = Vec::new();
        let mut failures = Vec::new();
        for (name, outcome) in join_all(fetches).await {
            match outcome {
                Ok(observation) => {
                    debug!("{}: {:?}", name, observation.metrics);
                    contributions.push(observation);
                }
                Err(e) => {
                    warn!("{} failed: {}", name, e);
                    failures.push(SourceFailure {
                        provider: name.to_string(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        if contributions.is_empty() {
            return Err(Error::AllSourcesFailed { causes: failures });
        }

        let consensus = ConsensusObservation {
            timestamp_ms: Utc::now().timestamp_millis(),
            location,
            metrics: mean_metrics(&contributions),
            confidence: mean(contributions.iter().map(|o| o.confidence)),
            sources: contributions.iter().map(|o| o.source.clone()).collect(),
        };

        Ok(AggregationOutcome {
            consensus,
            contributions,
            failures,
        })
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Per-metric arithmetic mean across the contributing observations.
/// Rainfall was already defaulted to 0 by the adapters, so it is always
/// included in the average, never excluded.
fn mean_metrics(observations: &[WeatherObservation]) -> WeatherMetrics {
    let avg =
        |metric: Metric| mean(observations.iter().map(|o| metric.value_in(&o.metrics)));
    WeatherMetrics {
        rainfall: avg(Metric::Rainfall),
        temperature: avg(Metric::Temperature),
        humidity: avg(Metric::Humidity),
        wind_speed: avg(Metric::WindSpeed),
        pressure: avg(Metric::Pressure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        name: &'static str,
        metrics: WeatherMetrics,
        confidence: f64,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(name: &'static str, metrics: WeatherMetrics, confidence: f64) -> Arc<Self> {
            Arc::new(Self {
                name,
                metrics,
                confidence,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl WeatherSource for FixedSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn current_weather(&self, location: GeoLocation) -> Result<WeatherObservation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(WeatherObservation {
                timestamp_ms: 1_755_000_000_000,
                location,
                metrics: self.metrics,
                confidence: self.confidence,
                source: self.name.to_string(),
            })
        }
    }

    struct FailingSource {
        name: &'static str,
    }

    #[async_trait]
    impl WeatherSource for FailingSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn current_weather(&self, _location: GeoLocation) -> Result<WeatherObservation> {
            Err(Error::Provider {
                provider: self.name.to_string(),
                cause: "simulated timeout".to_string(),
            })
        }
    }

    fn metrics(rainfall: f64, temperature: f64) -> WeatherMetrics {
        WeatherMetrics {
            rainfall,
            temperature,
            humidity: 80.0,
            wind_speed: 10.0,
            pressure: 1010.0,
        }
    }

    fn nairobi() -> GeoLocation {
        GeoLocation::new(-1.2921, 36.8219).unwrap()
    }

    #[tokio::test]
    async fn test_consensus_is_per_metric_mean_of_survivors() {
        let aggregator = WeatherAggregator::new(vec![
            FixedSource::new("A", metrics(0.0, 14.0), 0.90),
            FixedSource::new("B", metrics(3.0, 16.0), 0.95),
            Arc::new(FailingSource { name: "C" }),
        ]);

        let outcome = aggregator.aggregated_weather(nairobi()).await.unwrap();
        let consensus = &outcome.consensus;

        assert_eq!(consensus.sources, vec!["A", "B"]);
        assert!((consensus.metrics.rainfall - 1.5).abs() < 1e-9);
        assert!((consensus.metrics.temperature - 15.0).abs() < 1e-9);
        assert!((consensus.confidence - 0.925).abs() < 1e-9);
        assert_eq!(outcome.contributions.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].provider, "C");
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_an_error_with_every_cause() {
        let aggregator = WeatherAggregator::new(vec![
            Arc::new(FailingSource { name: "A" }),
            Arc::new(FailingSource { name: "B" }),
        ]);

        let err = aggregator.aggregated_weather(nairobi()).await.unwrap_err();
        match err {
            Error::AllSourcesFailed { causes } => {
                assert_eq!(causes.len(), 2);
                assert_eq!(causes[0].provider, "A");
                assert_eq!(causes[1].provider, "B");
            }
            other => panic!("expected AllSourcesFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_suppress_the_rest() {
        let survivor = FixedSource::new("Only", metrics(2.0, 20.0), 0.9);
        let aggregator = WeatherAggregator::new(vec![
            Arc::new(FailingSource { name: "Down" }),
            survivor.clone(),
        ]);

        let outcome = aggregator.aggregated_weather(nairobi()).await.unwrap();
        assert_eq!(outcome.consensus.sources, vec!["Only"]);
        assert_eq!(outcome.consensus.metrics.temperature, 20.0);
        assert_eq!(survivor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_source_order_is_configured_order() {
        let aggregator = WeatherAggregator::new(vec![
            FixedSource::new("First", metrics(0.0, 10.0), 0.9),
            FixedSource::new("Second", metrics(0.0, 10.0), 0.9),
            FixedSource::new("Third", metrics(0.0, 10.0), 0.9),
        ]);

        for _ in 0..3 {
            let outcome = aggregator.aggregated_weather(nairobi()).await.unwrap();
            assert_eq!(outcome.consensus.sources, vec!["First", "Second", "Third"]);
        }
    }
}
