//! Unified error type for the weather oracle core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single provider's failure, retained so an aggregate failure can show
/// every cause (one flaky provider vs. systemic outage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFailure {
    pub provider: String,
    pub cause: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{provider} fetch failed: {cause}")]
    Provider { provider: String, cause: String },

    #[error("all weather sources failed: {}", format_causes(.causes))]
    AllSourcesFailed { causes: Vec<SourceFailure> },

    #[error("unsupported crop/season combination: {crop}/{season}")]
    UnsupportedCropSeason { crop: String, season: String },

    #[error("insufficient history: got {points} point(s), need at least 2")]
    InsufficientHistory { points: usize },

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_causes(causes: &[SourceFailure]) -> String {
    causes
        .iter()
        .map(|f| format!("{}: {}", f.provider, f.cause))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_sources_failed_lists_every_cause() {
        let err = Error::AllSourcesFailed {
            causes: vec![
                SourceFailure {
                    provider: "OpenWeatherMap".into(),
                    cause: "timeout".into(),
                },
                SourceFailure {
                    provider: "Tomorrow.io".into(),
                    cause: "status 503".into(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("OpenWeatherMap: timeout"));
        assert!(msg.contains("Tomorrow.io: status 503"));
    }
}
