//! OpenWeatherMap current-conditions adapter.
//!
//! Normalizes `GET /data/2.5/weather` responses into canonical
//! `WeatherObservation`s. With `units=metric` the wind arrives in m/s and is
//! converted to km/h here — the aggregator never sees provider units.

use async_trait::async_trait;
use chrono::Utc;
use common::config::ProviderConfig;
use common::{Error, GeoLocation, Result, WeatherMetrics, WeatherObservation};
use provider_core::{truncate_body, CacheKey, ObservationCache, RateLimiter, WeatherSource};
use serde::Deserialize;
use tracing::debug;

pub const SOURCE_NAME: &str = "OpenWeatherMap";

const MPS_TO_KMH: f64 = 3.6;

/// OpenWeatherMap API client with per-provider rate limiting and caching.
#[derive(Debug)]
pub struct OpenWeatherClient {
    config: ProviderConfig,
    client: reqwest::Client,
    limiter: RateLimiter,
    cache: ObservationCache,
}

// ── Response types ────────────────────────────────────────────────────

/// Response from `/weather` (only the fields the oracle consumes).
#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    #[serde(default)]
    pub dt: Option<i64>,
    #[serde(default)]
    pub main: Option<MainBlock>,
    #[serde(default)]
    pub wind: Option<WindBlock>,
    #[serde(default)]
    pub rain: Option<RainBlock>,
}

#[derive(Debug, Deserialize)]
pub struct MainBlock {
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WindBlock {
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RainBlock {
    /// Accumulation over the last hour, mm. Absent when dry.
    #[serde(rename = "1h", default)]
    pub one_hour: Option<f64>,
}

// ── Implementation ────────────────────────────────────────────────────

impl OpenWeatherClient {
    pub fn new(config: ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to build OpenWeatherMap HTTP client");
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
        let url = format!("{}/weather", self.config.base_url);
        debug!(
            "Fetching OpenWeatherMap current conditions: {} lat={} lon={}",
            url, location.lat, location.lon
        );

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("lat", location.lat.to_string()),
                ("lon", location.lon.to_string()),
                ("appid", self.config.api_key.clone()),
                ("units", "metric".to_string()),
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
impl WeatherSource for OpenWeatherClient {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn current_weather(&self, location: GeoLocation) -> Result<WeatherObservation> {
        let key = CacheKey::new(SOURCE_NAME, location);
        if let Some(cached) = self.cache.get(&key) {
            debug!(
                "OpenWeatherMap cache hit for ({}, {})",
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

/// Map the provider payload to canonical metrics. Rainfall has a safe zero
/// (dry hour); temperature, humidity, pressure, and wind do not, so their
/// absence is a fetch failure rather than a fabricated reading.
fn observation_from_response(
    raw: &CurrentResponse,
    location: GeoLocation,
    confidence: f64,
) -> Result<WeatherObservation> {
    let main = raw.main.as_ref().ok_or_else(|| missing("main"))?;

    let metrics = WeatherMetrics {
        rainfall: raw.rain.as_ref().and_then(|r| r.one_hour).unwrap_or(0.0),
        temperature: main.temp.ok_or_else(|| missing("main.temp"))?,
        humidity: main.humidity.ok_or_else(|| missing("main.humidity"))?,
        wind_speed: raw
            .wind
            .as_ref()
            .and_then(|w| w.speed)
            .ok_or_else(|| missing("wind.speed"))?
            * MPS_TO_KMH,
        pressure: main.pressure.ok_or_else(|| missing("main.pressure"))?,
    };

    Ok(WeatherObservation {
        timestamp_ms: raw
            .dt
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
