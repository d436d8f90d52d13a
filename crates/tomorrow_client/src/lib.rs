//! Tomorrow.io realtime-conditions adapter.
//!
//! Normalizes `GET /v4/weather/realtime` responses into canonical
//! `WeatherObservation`s. Tomorrow.io reports wind in m/s (converted to
//! km/h here) and precipitation as an intensity in mm/h, which maps onto
//! the canonical rainfall accumulation field.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::config::ProviderConfig;
use common::{Error, GeoLocation, Result, WeatherMetrics, WeatherObservation};
use provider_core::{truncate_body, CacheKey, ObservationCache, RateLimiter, WeatherSource};
use serde::Deserialize;
use tracing::debug;

pub const SOURCE_NAME: &str = "Tomorrow.io";

const MPS_TO_KMH: f64 = 3.6;

/// Tomorrow.io API client with per-provider rate limiting and caching.
#[derive(Debug)]
pub struct TomorrowClient {
    config: ProviderConfig,
    client: reqwest::Client,
    limiter: RateLimiter,
    cache: ObservationCache,
}

// ── Response types ────────────────────────────────────────────────────

/// Response from `/weather/realtime` (only the fields the oracle consumes).
#[derive(Debug, Deserialize)]
pub struct RealtimeResponse {
    #[serde(default)]
    pub data: Option<DataBlock>,
}

#[derive(Debug, Deserialize)]
pub struct DataBlock {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub values: Option<ValuesBlock>,
}

#[derive(Debug, Deserialize)]
pub struct ValuesBlock {
    /// mm/h. Absent when dry.
    #[serde(rename = "precipitationIntensity", default)]
    pub precipitation_intensity: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(rename = "windSpeed", default)]
    pub wind_speed: Option<f64>,
    #[serde(rename = "pressureSurfaceLevel", default)]
    pub pressure_surface_level: Option<f64>,
}

// ── Implementation ────────────────────────────────────────────────────

impl TomorrowClient {
    pub fn new(config: ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to build Tomorrow.io HTTP client");
        let limiter = RateLimiter::new(config.max_requests_per_window, config.rate_window_ms);
        let cache = ObservationCache::new(config.cache_ttl_ms);

        Self {
            config,
            client,
            limiter,
            cache,
        }
    }

    async fn fetch_realtime(&self, location: GeoLocation) -> Result<RealtimeResponse> {
        let url = format!("{}/weather/realtime", self.config.base_url);
        debug!(
            "Fetching Tomorrow.io realtime conditions: {} location={},{}",
            url, location.lat, location.lon
        );

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("location", format!("{},{}", location.lat, location.lon)),
                ("apikey", self.config.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| provider_error(format!("HTTP error for ({}, {}): {e}", location.lat, location.lon)))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(provider_error(format!(
                "status {} for ({}, {}): {}",
                status,
                location.lat,
                location.lon,
                truncate_body(&body, 500)
            )));
        }

        resp.json()
            .await
            .map_err(|e| provider_error(format!("JSON parse error for ({}, {}): {e}", location.lat, location.lon)))
    }
}

#[async_trait]
impl WeatherSource for TomorrowClient {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn current_weather(&self, location: GeoLocation) -> Result<WeatherObservation> {
        let key = CacheKey::new(SOURCE_NAME, location);
        if let Some(cached) = self.cache.get(&key) {
            debug!(
                "Tomorrow.io cache hit for ({}, {})",
                location.lat, location.lon
            );
            return Ok(cached);
        }

        self.limiter.acquire().await;
        let raw = self.fetch_realtime(location).await?;
        let observation = observation_from_response(&raw, location, self.config.confidence)?;
        self.cache.set(key, observation.clone());
        Ok(observation)
    }
}

fn observation_from_response(
    raw: &RealtimeResponse,
    location: GeoLocation,
    confidence: f64,
) -> Result<WeatherObservation> {
    let data = raw.data.as_ref().ok_or_else(|| missing("data"))?;
    let values = data.values.as_ref().ok_or_else(|| missing("data.values"))?;

    let metrics = WeatherMetrics {
        rainfall: values.precipitation_intensity.unwrap_or(0.0),
        temperature: values
            .temperature
            .ok_or_else(|| missing("data.values.temperature"))?,
        humidity: values
            .humidity
            .ok_or_else(|| missing("data.values.humidity"))?,
        wind_speed: values
            .wind_speed
            .ok_or_else(|| missing("data.values.windSpeed"))?
            * MPS_TO_KMH,
        pressure: values
            .pressure_surface_level
            .ok_or_else(|| missing("data.values.pressureSurfaceLevel"))?,
    };

    let timestamp_ms = data
        .time
        .as_deref()
        .and_then(|raw_time| DateTime::parse_from_rfc3339(raw_time).ok())
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
        .unwrap_or_else(|| Utc::now().timestamp_millis());

    Ok(WeatherObservation {
        timestamp_ms,
        location,
        metrics,
        confidence,
        source: SOURCE_NAME.to_string(),
    })
}

fn missing(field: &str) -> Error {
    provider_error(format!("response missing required field {field}"))
}

fn provider_error(cause: String) -> Error {
    Error::Provider {
        provider: SOURCE_NAME.to_string(),
        cause,
    }
}
