//! Configuration loader — merges .env, an optional config.toml, and
//! environment-variable overrides for provider credentials.

use std::path::Path;

use common::config::{OracleConfig, ProviderConfig};
use common::{Error, Metric, Result};

/// Load oracle configuration. Priority: env vars > config file > defaults.
pub fn load_config(path: Option<&Path>) -> Result<OracleConfig> {
    // 1. Load .env from the working directory or parents.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = OracleConfig::default();

    // 3. Overlay config.toml when present (or the explicit --config path).
    let config_path = path.unwrap_or_else(|| Path::new("config.toml"));
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", config_path.display())))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", config_path.display())))?;
    } else if path.is_some() {
        return Err(Error::Config(format!(
            "config file not found: {}",
            config_path.display()
        )));
    }

    // 4. Environment variables win (the credential names the deployment
    //    already uses).
    if let Ok(key) = std::env::var("OPENWEATHER_API_KEY") {
        config.providers.openweather.api_key = key;
    }
    if let Ok(key) = std::env::var("WEATHERAPI_KEY") {
        config.providers.weatherapi.api_key = key;
    }
    if let Ok(key) = std::env::var("TOMORROWAPI_KEY") {
        config.providers.tomorrow.api_key = key;
    }

    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &OracleConfig) -> Result<()> {
    let mut issues: Vec<String> = Vec::new();

    let provider_blocks = [
        ("openweather", &config.providers.openweather),
        ("weatherapi", &config.providers.weatherapi),
        ("tomorrow", &config.providers.tomorrow),
    ];

    for (name, provider) in provider_blocks {
        validate_provider(name, provider, &mut issues);
    }

    if provider_blocks
        .iter()
        .all(|(_, p)| p.api_key.trim().is_empty())
    {
        issues.push("at least one provider API key must be configured".into());
    }

    for metric in Metric::ALL {
        if config.anomaly.tolerance_for(metric) < 0.0 {
            issues.push(format!(
                "anomaly tolerance for {} must be >= 0",
                metric.name()
            ));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

fn validate_provider(name: &str, provider: &ProviderConfig, issues: &mut Vec<String>) {
    if provider.base_url.trim().is_empty() {
        issues.push(format!("providers.{name}.base_url must not be empty"));
    }
    if provider.timeout_ms == 0 {
        issues.push(format!("providers.{name}.timeout_ms must be > 0"));
    }
    if !(0.0..=1.0).contains(&provider.confidence) {
        issues.push(format!("providers.{name}.confidence must be in [0, 1]"));
    }
    if provider.max_requests_per_window == 0 {
        issues.push(format!(
            "providers.{name}.max_requests_per_window must be > 0"
        ));
    }
    if provider.rate_window_ms == 0 {
        issues.push(format!("providers.{name}.rate_window_ms must be > 0"));
    }
    if provider.cache_ttl_ms == 0 {
        issues.push(format!("providers.{name}.cache_ttl_ms must be > 0"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_with_a_key_validates() {
        let mut config = OracleConfig::default();
        config.providers.openweather.api_key = "k".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_no_keys_at_all_is_rejected() {
        let config = OracleConfig::default();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("at least one provider API key"));
    }

    #[test]
    fn test_issues_are_collected_not_first_only() {
        let mut config = OracleConfig::default();
        config.providers.openweather.api_key = "k".into();
        config.providers.openweather.timeout_ms = 0;
        config.providers.tomorrow.confidence = 1.5;

        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("openweather.timeout_ms"));
        assert!(msg.contains("tomorrow.confidence"));
    }
}
