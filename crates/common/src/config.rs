//! Oracle configuration types.

use serde::{Deserialize, Serialize};

use crate::types::Metric;

/// Top-level oracle configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Per-provider adapter settings.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Cross-source disagreement tolerances.
    #[serde(default)]
    pub anomaly: AnomalyConfig,
}

/// One block per supported provider. A provider with an empty API key is
/// skipped at construction time. Config files may set any subset of a
/// block's fields; unset fields keep that provider's built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ProvidersOverrides")]
pub struct ProvidersConfig {
    pub openweather: ProviderConfig,
    pub weatherapi: ProviderConfig,
    pub tomorrow: ProviderConfig,
}

/// Partial provider block as written in a config file.
#[derive(Debug, Clone, Default, Deserialize)]
struct ProviderOverrides {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_ms: Option<u64>,
    confidence: Option<f64>,
    max_requests_per_window: Option<u32>,
    rate_window_ms: Option<u64>,
    cache_ttl_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProvidersOverrides {
    #[serde(default)]
    openweather: ProviderOverrides,
    #[serde(default)]
    weatherapi: ProviderOverrides,
    #[serde(default)]
    tomorrow: ProviderOverrides,
}

impl From<ProvidersOverrides> for ProvidersConfig {
    fn from(overrides: ProvidersOverrides) -> Self {
        Self {
            openweather: default_openweather().merged(overrides.openweather),
            weatherapi: default_weatherapi().merged(overrides.weatherapi),
            tomorrow: default_tomorrow().merged(overrides.tomorrow),
        }
    }
}

/// Settings for a single provider adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Credential, resolved externally (env or config file).
    #[serde(default)]
    pub api_key: String,

    /// API root, without a trailing slash.
    pub base_url: String,

    /// Per-request network timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Provider-declared data quality (0-1). Fixed per provider, reflecting
    /// typical station density and interpolation quality.
    pub confidence: f64,

    /// Max requests per rate-limit window.
    #[serde(default = "default_rate_limit")]
    pub max_requests_per_window: u32,

    /// Rate-limit window length.
    #[serde(default = "default_rate_window_ms")]
    pub rate_window_ms: u64,

    /// Observation cache TTL.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
}

/// Per-metric spread tolerances for the anomaly detector. Each metric has
/// its own natural cross-provider variance, so the bands differ in absolute
/// terms (temperature tighter than pressure, humidity tighter than wind).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyConfig {
    #[serde(default = "default_rainfall_tolerance")]
    pub rainfall_tolerance_mm: f64,

    #[serde(default = "default_temperature_tolerance")]
    pub temperature_tolerance_c: f64,

    #[serde(default = "default_humidity_tolerance")]
    pub humidity_tolerance_pct: f64,

    #[serde(default = "default_wind_speed_tolerance")]
    pub wind_speed_tolerance_kmh: f64,

    #[serde(default = "default_pressure_tolerance")]
    pub pressure_tolerance_hpa: f64,
}

impl ProviderConfig {
    fn merged(mut self, overrides: ProviderOverrides) -> Self {
        if let Some(v) = overrides.api_key {
            self.api_key = v;
        }
        if let Some(v) = overrides.base_url {
            self.base_url = v;
        }
        if let Some(v) = overrides.timeout_ms {
            self.timeout_ms = v;
        }
        if let Some(v) = overrides.confidence {
            self.confidence = v;
        }
        if let Some(v) = overrides.max_requests_per_window {
            self.max_requests_per_window = v;
        }
        if let Some(v) = overrides.rate_window_ms {
            self.rate_window_ms = v;
        }
        if let Some(v) = overrides.cache_ttl_ms {
            self.cache_ttl_ms = v;
        }
        self
    }
}

impl AnomalyConfig {
    pub fn tolerance_for(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Rainfall => self.rainfall_tolerance_mm,
            Metric::Temperature => self.temperature_tolerance_c,
            Metric::Humidity => self.humidity_tolerance_pct,
            Metric::WindSpeed => self.wind_speed_tolerance_kmh,
            Metric::Pressure => self.pressure_tolerance_hpa,
        }
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_timeout_ms() -> u64 {
    5_000
}
fn default_rate_limit() -> u32 {
    60
}
fn default_rate_window_ms() -> u64 {
    60_000
}
fn default_cache_ttl_ms() -> u64 {
    300_000
}

fn default_rainfall_tolerance() -> f64 {
    5.0
}
fn default_temperature_tolerance() -> f64 {
    2.0
}
fn default_humidity_tolerance() -> f64 {
    15.0
}
fn default_wind_speed_tolerance() -> f64 {
    20.0
}
fn default_pressure_tolerance() -> f64 {
    10.0
}

fn default_openweather() -> ProviderConfig {
    ProviderConfig {
        api_key: String::new(),
        base_url: "https://api.openweathermap.org/data/2.5".into(),
        timeout_ms: default_timeout_ms(),
        confidence: 0.90,
        max_requests_per_window: default_rate_limit(),
        rate_window_ms: default_rate_window_ms(),
        cache_ttl_ms: default_cache_ttl_ms(),
    }
}

fn default_weatherapi() -> ProviderConfig {
    ProviderConfig {
        api_key: String::new(),
        base_url: "http://api.weatherapi.com/v1".into(),
        timeout_ms: default_timeout_ms(),
        confidence: 0.95,
        max_requests_per_window: default_rate_limit(),
        rate_window_ms: default_rate_window_ms(),
        cache_ttl_ms: default_cache_ttl_ms(),
    }
}

fn default_tomorrow() -> ProviderConfig {
    ProviderConfig {
        api_key: String::new(),
        base_url: "https://api.tomorrow.io/v4".into(),
        timeout_ms: default_timeout_ms(),
        confidence: 0.95,
        max_requests_per_window: default_rate_limit(),
        rate_window_ms: default_rate_window_ms(),
        cache_ttl_ms: default_cache_ttl_ms(),
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openweather: default_openweather(),
            weatherapi: default_weatherapi(),
            tomorrow: default_tomorrow(),
        }
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            rainfall_tolerance_mm: default_rainfall_tolerance(),
            temperature_tolerance_c: default_temperature_tolerance(),
            humidity_tolerance_pct: default_humidity_tolerance(),
            wind_speed_tolerance_kmh: default_wind_speed_tolerance(),
            pressure_tolerance_hpa: default_pressure_tolerance(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_provider_block_keeps_built_in_defaults() {
        let cfg: OracleConfig =
            toml::from_str("[providers.openweather]\napi_key = \"k\"\n").unwrap();

        let ow = &cfg.providers.openweather;
        assert_eq!(ow.api_key, "k");
        assert_eq!(ow.base_url, "https://api.openweathermap.org/data/2.5");
        assert_eq!(ow.confidence, 0.90);
        assert_eq!(ow.cache_ttl_ms, 300_000);

        // Untouched blocks stay at their own defaults.
        assert_eq!(cfg.providers.weatherapi.confidence, 0.95);
        assert!(cfg.providers.tomorrow.api_key.is_empty());
    }

    #[test]
    fn test_overridden_fields_win_over_defaults() {
        let cfg: OracleConfig = toml::from_str(
            "[providers.tomorrow]\napi_key = \"t\"\nconfidence = 0.8\ncache_ttl_ms = 60000\n",
        )
        .unwrap();

        let tomorrow = &cfg.providers.tomorrow;
        assert_eq!(tomorrow.confidence, 0.8);
        assert_eq!(tomorrow.cache_ttl_ms, 60_000);
        assert_eq!(tomorrow.base_url, "https://api.tomorrow.io/v4");
    }

    #[test]
    fn test_empty_document_is_all_defaults() {
        let cfg: OracleConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.providers.openweather.timeout_ms, 5_000);
        assert_eq!(cfg.anomaly.temperature_tolerance_c, 2.0);
    }
}
