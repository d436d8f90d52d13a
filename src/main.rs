//! agri-oracle: fetch current weather from multiple providers, fuse it
//! into a consensus observation, and score agricultural risk.

mod config;

use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use aggregator::{AnomalyDetector, WeatherAggregator};
use common::config::ProviderConfig;
use common::{
    AnomalyReport, ConsensusObservation, GeoLocation, Result, RiskReport, SourceFailure,
    WeatherMetrics,
};
use openweather_client::OpenWeatherClient;
use provider_core::WeatherSource;
use risk_engine::{
    CompoundRiskDetector, Crop, CropRiskAssessment, HistoricalPatternAnalyzer, Season,
};
use tomorrow_client::TomorrowClient;
use weatherapi_client::WeatherApiClient;

#[derive(Parser, Debug)]
#[command(name = "agri-oracle", about = "Multi-source weather fusion and agricultural risk scoring")]
struct Cli {
    /// Latitude in degrees, [-90, 90]
    #[arg(long)]
    lat: f64,

    /// Longitude in degrees, [-180, 180]
    #[arg(long)]
    lon: f64,

    /// Crop for rainfall risk scoring (maize, rice, wheat, sorghum)
    #[arg(long)]
    crop: Option<Crop>,

    /// Season for rainfall risk scoring (rainy, dry)
    #[arg(long)]
    season: Option<Season>,

    /// JSON file with historical WeatherMetrics for deviation analysis
    #[arg(long)]
    history: Option<PathBuf>,

    /// Path to a config.toml (defaults to ./config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Everything one run produces, serialized to stdout as JSON.
#[derive(Debug, Serialize)]
struct OraclePayload {
    consensus: ConsensusObservation,
    anomaly: AnomalyReport,
    compound_risk: RiskReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    crop_risk: Option<RiskReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    historical_risk: Option<RiskReport>,
    source_failures: Vec<SourceFailure>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("agri_oracle=info,aggregator=info,provider_core=info")
        }))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{e}");
        exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = config::load_config(cli.config.as_deref())?;
    let location = GeoLocation::new(cli.lat, cli.lon)?;

    if cli.crop.is_some() != cli.season.is_some() {
        return Err(common::Error::Config(
            "--crop and --season must be given together".into(),
        ));
    }

    let sources = build_sources(&cfg);
    if sources.is_empty() {
        return Err(common::Error::Config(
            "no provider has an API key configured".into(),
        ));
    }
    info!(
        sources = ?sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
        "fetching weather for ({}, {})",
        location.lat,
        location.lon
    );

    let aggregator = WeatherAggregator::new(sources);
    let outcome = aggregator.aggregated_weather(location).await?;
    for failure in &outcome.failures {
        warn!("{} unavailable: {}", failure.provider, failure.cause);
    }

    let anomaly = AnomalyDetector::new(cfg.anomaly.clone()).detect(&outcome.contributions);
    for metric in anomaly.flagged_metrics() {
        warn!("providers disagree on {metric} beyond tolerance");
    }

    let compound_risk =
        CompoundRiskDetector::default().detect_compound_risk(&outcome.consensus.metrics);

    let crop_risk = match (cli.crop, cli.season) {
        (Some(crop), Some(season)) => Some(CropRiskAssessment::new().calculate_rainfall_risk(
            outcome.consensus.metrics.rainfall,
            crop,
            season,
        )?),
        _ => None,
    };

    let historical_risk = match &cli.history {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let history: Vec<WeatherMetrics> = serde_json::from_str(&raw)?;
            Some(
                HistoricalPatternAnalyzer::new()
                    .analyze_against_historical(&outcome.consensus.metrics, &history)?,
            )
        }
        None => None,
    };

    let payload = OraclePayload {
        consensus: outcome.consensus,
        anomaly,
        compound_risk,
        crop_risk,
        historical_risk,
        source_failures: outcome.failures,
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// Instantiate a client per configured provider, skipping any without a key.
fn build_sources(cfg: &common::config::OracleConfig) -> Vec<Arc<dyn WeatherSource>> {
    let mut sources: Vec<Arc<dyn WeatherSource>> = Vec::new();

    let enabled = |name: &str, provider: &ProviderConfig| {
        if provider.api_key.trim().is_empty() {
            warn!("{name}: no API key, skipping");
            false
        } else {
            true
        }
    };

    if enabled("openweather", &cfg.providers.openweather) {
        sources.push(Arc::new(OpenWeatherClient::new(
            cfg.providers.openweather.clone(),
        )));
    }
    if enabled("weatherapi", &cfg.providers.weatherapi) {
        sources.push(Arc::new(WeatherApiClient::new(
            cfg.providers.weatherapi.clone(),
        )));
    }
    if enabled("tomorrow", &cfg.providers.tomorrow) {
        sources.push(Arc::new(TomorrowClient::new(cfg.providers.tomorrow.clone())));
    }

    sources
}
