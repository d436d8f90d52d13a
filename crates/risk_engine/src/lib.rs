//! Agricultural risk engines: single-factor crop rainfall risk, compound
//! multi-extreme risk, and historical-deviation risk.
//!
//! All three are pure functions of already-fetched data — no I/O. Their
//! validation failures (`UnsupportedCropSeason`, `InsufficientHistory`)
//! propagate to the caller; there is no safe default to substitute in a
//! payout-bearing computation.

pub mod compound;
pub mod crop;
pub mod historical;

pub use compound::{Comparison, CompoundRiskDetector, CompoundRule, Condition};
pub use crop::{Crop, CropRiskAssessment, RainfallBand, Season};
pub use historical::HistoricalPatternAnalyzer;
