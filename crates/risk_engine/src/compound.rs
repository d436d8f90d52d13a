//! Compound risk: co-occurring weather extremes.
//!
//! Each rule is a conjunction of per-metric threshold predicates. The
//! score counts triggered rules (weighted), and the level escalates
//! super-linearly with that count — simultaneous extremes are
//! disproportionately dangerous compared to any single one.

use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Metric, RiskLevel, RiskReport, WeatherMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    GreaterThan,
    LessThan,
}

/// One per-metric predicate inside a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub metric: Metric,
    pub comparison: Comparison,
    pub threshold: f64,
}

impl Condition {
    fn holds(&self, metrics: &WeatherMetrics) -> bool {
        let value = self.metric.value_in(metrics);
        match self.comparison {
            Comparison::GreaterThan => value > self.threshold,
            Comparison::LessThan => value < self.threshold,
        }
    }
}

/// A named conjunction of conditions; fires only when all hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundRule {
    pub name: String,
    pub conditions: Vec<Condition>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl CompoundRule {
    fn triggered(&self, metrics: &WeatherMetrics) -> bool {
        !self.conditions.is_empty() && self.conditions.iter().all(|c| c.holds(metrics))
    }
}

pub struct CompoundRiskDetector {
    rules: Vec<CompoundRule>,
}

impl CompoundRiskDetector {
    pub fn new(rules: Vec<CompoundRule>) -> Self {
        Self { rules }
    }

    /// Evaluate every rule against `metrics`. Triggers are reported in
    /// rule-definition order; the level follows the escalation table
    /// 0 → LOW, 1 → MODERATE, 2 → HIGH, ≥3 → SEVERE.
    pub fn detect_compound_risk(&self, metrics: &WeatherMetrics) -> RiskReport {
        let fired: Vec<&CompoundRule> = self
            .rules
            .iter()
            .filter(|rule| rule.triggered(metrics))
            .collect();

        for rule in &fired {
            debug!("compound rule fired: {}", rule.name);
        }

        let level = match fired.len() {
            0 => RiskLevel::Low,
            1 => RiskLevel::Moderate,
            2 => RiskLevel::High,
            _ => RiskLevel::Severe,
        };

        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert(
            "rules_evaluated".into(),
            serde_json::json!(self.rules.len()),
        );
        metadata.insert("rules_triggered".into(), serde_json::json!(fired.len()));

        RiskReport {
            level,
            score: fired.iter().map(|rule| rule.weight).sum(),
            triggers: fired.iter().map(|rule| rule.name.clone()).collect(),
            metadata,
        }
    }
}

impl Default for CompoundRiskDetector {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

/// Standing rule set for tropical smallholder conditions.
pub fn default_rules() -> Vec<CompoundRule> {
    let gt = |metric, threshold| Condition {
        metric,
        comparison: Comparison::GreaterThan,
        threshold,
    };
    let lt = |metric, threshold| Condition {
        metric,
        comparison: Comparison::LessThan,
        threshold,
    };

    vec![
        CompoundRule {
            name: "heat_humidity_stress".into(),
            conditions: vec![gt(Metric::Temperature, 35.0), gt(Metric::Humidity, 70.0)],
            weight: 1.0,
        },
        CompoundRule {
            name: "flood_wind_damage".into(),
            conditions: vec![gt(Metric::Rainfall, 50.0), gt(Metric::WindSpeed, 40.0)],
            weight: 1.0,
        },
        CompoundRule {
            name: "drought_heat".into(),
            conditions: vec![lt(Metric::Rainfall, 5.0), gt(Metric::Temperature, 32.0)],
            weight: 1.0,
        },
        CompoundRule {
            name: "storm_pressure_drop".into(),
            conditions: vec![lt(Metric::Pressure, 990.0), gt(Metric::WindSpeed, 50.0)],
            weight: 1.0,
        },
    ]
}
