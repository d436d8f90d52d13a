//! Rainfall risk classification against crop/season agronomic bands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use common::{Error, Result, RiskLevel, RiskReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Crop {
    Maize,
    Rice,
    Wheat,
    Sorghum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Season {
    Rainy,
    Dry,
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Crop::Maize => "MAIZE",
            Crop::Rice => "RICE",
            Crop::Wheat => "WHEAT",
            Crop::Sorghum => "SORGHUM",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Season::Rainy => "RAINY",
            Season::Dry => "DRY",
        };
        f.write_str(label)
    }
}

impl FromStr for Crop {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MAIZE" => Ok(Crop::Maize),
            "RICE" => Ok(Crop::Rice),
            "WHEAT" => Ok(Crop::Wheat),
            "SORGHUM" => Ok(Crop::Sorghum),
            other => Err(Error::Config(format!("unknown crop: {other}"))),
        }
    }
}

impl FromStr for Season {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RAINY" => Ok(Season::Rainy),
            "DRY" => Ok(Season::Dry),
            other => Err(Error::Config(format!("unknown season: {other}"))),
        }
    }
}

/// Acceptable monthly rainfall band for a crop/season, in mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainfallBand {
    pub low_mm: f64,
    pub high_mm: f64,
}

/// Classifies a rainfall reading against the agronomic band for a
/// crop/season. Unsupported combinations are an error — silent defaults
/// are unacceptable in payout-bearing logic.
#[derive(Debug, Clone, Default)]
pub struct CropRiskAssessment;

impl CropRiskAssessment {
    pub fn new() -> Self {
        Self
    }

    /// The viable monthly rainfall band, or `None` where the combination
    /// is not cultivated (e.g. rainfed rice in the dry season).
    pub fn rainfall_band(crop: Crop, season: Season) -> Option<RainfallBand> {
        let band = |low_mm: f64, high_mm: f64| Some(RainfallBand { low_mm, high_mm });
        match (crop, season) {
            (Crop::Maize, Season::Rainy) => band(100.0, 300.0),
            (Crop::Maize, Season::Dry) => band(50.0, 150.0),
            (Crop::Rice, Season::Rainy) => band(150.0, 400.0),
            (Crop::Rice, Season::Dry) => None,
            (Crop::Wheat, Season::Rainy) => None,
            (Crop::Wheat, Season::Dry) => band(40.0, 120.0),
            (Crop::Sorghum, Season::Rainy) => band(60.0, 250.0),
            (Crop::Sorghum, Season::Dry) => band(30.0, 120.0),
        }
    }

    /// Classify `rainfall_mm` for the given crop/season. Within the band
    /// (boundaries included) the risk is LOW with no triggers; outside it,
    /// the level scales with the relative deficit or excess.
    pub fn calculate_rainfall_risk(
        &self,
        rainfall_mm: f64,
        crop: Crop,
        season: Season,
    ) -> Result<RiskReport> {
        let band = Self::rainfall_band(crop, season).ok_or_else(|| {
            Error::UnsupportedCropSeason {
                crop: crop.to_string(),
                season: season.to_string(),
            }
        })?;

        let (level, score, triggers) = if rainfall_mm < band.low_mm {
            let deficit = (band.low_mm - rainfall_mm) / band.low_mm;
            (
                level_for_ratio(deficit),
                deficit,
                vec!["rainfall_deficit".to_string()],
            )
        } else if rainfall_mm > band.high_mm {
            let excess = (rainfall_mm - band.high_mm) / band.high_mm;
            (
                level_for_ratio(excess),
                excess,
                vec!["rainfall_excess".to_string()],
            )
        } else {
            (RiskLevel::Low, 0.0, Vec::new())
        };

        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("rainfall_mm".into(), serde_json::json!(rainfall_mm));
        metadata.insert("crop".into(), serde_json::json!(crop));
        metadata.insert("season".into(), serde_json::json!(season));
        metadata.insert("low_threshold_mm".into(), serde_json::json!(band.low_mm));
        metadata.insert("high_threshold_mm".into(), serde_json::json!(band.high_mm));

        Ok(RiskReport {
            level,
            score,
            triggers,
            metadata,
        })
    }
}

/// Shared escalation for relative deficit/excess.
fn level_for_ratio(ratio: f64) -> RiskLevel {
    if ratio <= 0.15 {
        RiskLevel::Low
    } else if ratio <= 0.35 {
        RiskLevel::Moderate
    } else if ratio <= 0.60 {
        RiskLevel::High
    } else {
        RiskLevel::Severe
    }
}
