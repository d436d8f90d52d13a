//! WeatherAPI.com current-conditions adapter.
//!
//! Normalizes `GET /v1/current.json` responses into canonical
//! `WeatherObservation`s. This provider already reports km/h and millibars
//! (≡ hPa), so no unit conversion is needed beyond field mapping.

use async_trait::async_trait;
use chrono::Utc;
use common::config::ProviderConfig;
use common::{Error, GeoLocation, Result, WeatherMetrics, WeatherObservation};
use provider_core::{truncate_body, CacheKey, ObservationCache, RateLimiter, WeatherSource};
use serde::Deserialize;
use tracing::debug;

pub const SOURCE_NAME: &str = "WeatherAPI.com";

/// WeatherAPI.com client with per-provider rate limiting and caching.
#[derive(Debug)]
pub struct WeatherApiClient {
    config: ProviderConfig,
    client: reqwest::Client,
    limiter: RateLimiter,
    cache: ObservationCache,
}

// ── Response types ────────────────────────────────────────────────────

/// Response from `/current.json` (only the fields the oracle consumes).
#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    #[serde(default)]
    pub current: Option<CurrentBlock>,
}

#[derive(Debug, Deserialize)]
pub struct CurrentBlock {
    #[serde(default)]
    pub last_updated_epoch: Option<i64>,
    /// Precipitation in mm. Absent when dry.
    #[serde(default)]
    pub precip_mm: Option<f64>,
    #[serde(default)]
    pub temp_c: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub wind_kph: Option<f64>,
    #[serde(default)]
    pub pressure_mb: Option<f64>,
}

// ── Implementation ────────────────────────────────────────────────────

impl WeatherApiClient {
    pub fn new(config: ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to build WeatherAPI.com HTTP client");
        let limiter = RateLimiter::new(config.max_requests_per_window, config.rate_window_ms);
        let cache = ObservationCache::new(config.cache_ttl_ms);

        Self {
            config,
            client,
            limiter,
            cache,
        }
    }

    async fn fetch_current(&self, location: GeoLocation) -> Result<CurrentResponse> {
        let url = format!("{}/current.json", self.config.base_url);
        debug!(
            "Fetching WeatherAPI.com current conditions: {} q={},{}",
            url, location.lat, location.lon
        );

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("key", self.config.api_key.clone()),
                ("q", format!("{},{}", location.lat, location.lon)),
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
impl WeatherSource for WeatherApiClient {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn current_weather(&self, location: GeoLocation) -> Result<WeatherObservation> {
        let key = CacheKey::new(SOURCE_NAME, location);
        if let Some(cached) = self.cache.get(&key) {
            debug!(
                "WeatherAPI.com cache hit for ({}, {})",
                location.lat, location.lon
            );
            return Ok(cached);
        }

        self.limiter.acquire().await;
        let raw = self.fetch_current(location).await?;
        let observation = observation_from_response(&raw, location, self.config.confidence)?;
        self.cache.set(key, observation.clone());
        Ok(observation)
    }
}

fn observation_from_response(
    raw: &CurrentResponse,
    location: GeoLocation,
    confidence: f64,
) -> Result<WeatherObservation> {
    let current = raw.current.as_ref().ok_or_else(|| missing("current"))?;

    let metrics = WeatherMetrics {
        rainfall: current.precip_mm.unwrap_or(0.0),
        temperature: current.temp_c.ok_or_else(|| missing("current.temp_c"))?,
        humidity: current
            .humidity
            .ok_or_else(|| missing("current.humidity"))?,
        wind_speed: current
            .wind_kph
            .ok_or_else(|| missing("current.wind_kph"))?,
        pressure: current
            .pressure_mb
            .ok_or_else(|| missing("current.pressure_mb"))?,
    };

    Ok(WeatherObservation {
        timestamp_ms: current
            .last_updated_epoch
            .map(|secs| secs * 1_000)
            .unwrap_or_else(|| Utc::now().timestamp_millis()),
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
