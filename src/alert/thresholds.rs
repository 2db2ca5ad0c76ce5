//! Flood characteristics risk scoring.
//!
//! Converts modelled hydrological magnitudes (depth, velocity, inundation
//! area) into an additive point score, a 4-level severity and an itemized
//! list of the thresholds that fired. Thresholds live in `ScoringConfig`
//! so boundary values can be exercised in tests and tuned per deployment.

use serde::{Deserialize, Serialize};

use crate::logging::{self, Component};
use crate::model::{CharacteristicRiskLevel, FloodCharacteristics, FloodError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// One step of a tiered threshold: a value strictly above `above` earns
/// `points` and records `label` as a contributing factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTier {
    pub above: f64,
    pub points: u32,
    pub label: String,
}

impl ScoreTier {
    fn new(above: f64, points: u32, label: &str) -> Self {
        Self {
            above,
            points,
            label: label.to_string(),
        }
    }
}

/// Scoring thresholds. Each tier list is ordered from the highest threshold
/// down; only the first tier a value exceeds is counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub depth_tiers: Vec<ScoreTier>,
    pub velocity_tiers: Vec<ScoreTier>,
    pub area_tiers: Vec<ScoreTier>,
    /// Minimum score for each level above `low`.
    pub extreme_at: u32,
    pub high_at: u32,
    pub moderate_at: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            depth_tiers: vec![
                ScoreTier::new(2.0, 3, "Very high water depth (>2m)"),
                ScoreTier::new(1.5, 2, "High water depth (>1.5m)"),
                ScoreTier::new(1.0, 1, "Moderate water depth (>1m)"),
            ],
            velocity_tiers: vec![
                ScoreTier::new(3.0, 3, "Very high flow velocity (>3m/s)"),
                ScoreTier::new(2.0, 2, "High flow velocity (>2m/s)"),
                ScoreTier::new(1.0, 1, "Moderate flow velocity (>1m/s)"),
            ],
            area_tiers: vec![
                ScoreTier::new(10.0, 2, "Large inundation area (>10km²)"),
                ScoreTier::new(5.0, 1, "Moderate inundation area (>5km²)"),
            ],
            extreme_at: 6,
            high_at: 4,
            moderate_at: 2,
        }
    }
}

impl ScoringConfig {
    /// Checks that tiers descend and level cutoffs ascend.
    pub fn validate(&self) -> Result<(), FloodError> {
        let lists = [
            ("depth_tiers", &self.depth_tiers),
            ("velocity_tiers", &self.velocity_tiers),
            ("area_tiers", &self.area_tiers),
        ];
        for (name, tiers) in lists {
            if tiers.windows(2).any(|w| w[0].above <= w[1].above) {
                return Err(FloodError::Config(format!(
                    "scoring.{} must be ordered from highest threshold down",
                    name
                )));
            }
        }
        if !(self.moderate_at < self.high_at && self.high_at < self.extreme_at) {
            return Err(FloodError::Config(
                "scoring cutoffs must satisfy moderate_at < high_at < extreme_at".to_string(),
            ));
        }
        Ok(())
    }

    /// Highest score the configured tiers can produce.
    pub fn max_score(&self) -> u32 {
        [&self.depth_tiers, &self.velocity_tiers, &self.area_tiers]
            .iter()
            .map(|tiers| tiers.iter().map(|t| t.points).max().unwrap_or(0))
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: u32,
    /// Triggered thresholds in depth, velocity, area order.
    pub factors: Vec<String>,
    pub level: CharacteristicRiskLevel,
}

impl RiskAssessment {
    /// One-line text for dashboards and logs.
    pub fn summary(&self) -> String {
        if self.factors.is_empty() {
            format!("{} risk (score {}): no thresholds exceeded", self.level.as_str(), self.score)
        } else {
            format!(
                "{} risk (score {}): {}",
                self.level.as_str(),
                self.score,
                self.factors.join("; ")
            )
        }
    }
}

/// Scores a validated flood characteristics record.
pub fn score_flood_risk(
    characteristics: &FloodCharacteristics,
    config: &ScoringConfig,
) -> RiskAssessment {
    let assessment = score_magnitudes(
        characteristics.max_depth_m.value,
        characteristics.peak_velocity_ms.value,
        characteristics.inundation_area_km2.value,
        config,
    );
    logging::debug(
        Component::Scorer,
        Some(&characteristics.location_name),
        &assessment.summary(),
    );
    assessment
}

/// Scores raw magnitudes.
///
/// Total for any input. A NaN compares false against every threshold and so
/// contributes nothing; use `FloodCharacteristics::new` to reject such
/// values before they get here.
pub fn score_magnitudes(
    max_depth_m: f64,
    peak_velocity_ms: f64,
    inundation_area_km2: f64,
    config: &ScoringConfig,
) -> RiskAssessment {
    let mut score = 0;
    let mut factors = Vec::new();

    let checks = [
        (max_depth_m, &config.depth_tiers),
        (peak_velocity_ms, &config.velocity_tiers),
        (inundation_area_km2, &config.area_tiers),
    ];
    for (value, tiers) in checks {
        if let Some(tier) = tiers.iter().find(|t| value > t.above) {
            score += tier.points;
            factors.push(tier.label.clone());
        }
    }

    RiskAssessment {
        score,
        factors,
        level: level_for_score(score, config),
    }
}

/// Maps a point score onto the 4-level scale.
pub fn level_for_score(score: u32, config: &ScoringConfig) -> CharacteristicRiskLevel {
    if score >= config.extreme_at {
        CharacteristicRiskLevel::Extreme
    } else if score >= config.high_at {
        CharacteristicRiskLevel::High
    } else if score >= config.moderate_at {
        CharacteristicRiskLevel::Moderate
    } else {
        CharacteristicRiskLevel::Low
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
