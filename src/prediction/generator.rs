//! Rule-based flood prediction generator.
//!
//! Probability comes from the barangay's static risk class plus additive
//! rainfall and water-level adjustments, clamped to `max_probability`. Risk
//! level and alert level are both thresholded from that one probability.
//! Predicted rainfall and confidence are drawn from an injected RNG: pass a
//! seeded generator for reproducible output, `rand::thread_rng()` otherwise.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::alert::freshness::{is_recent_active_at, DEFAULT_MAX_AGE_MINUTES};
use crate::analysis::aggregation::PredictionInputs;
use crate::barangays::BarangayProfile;
use crate::logging::{self, Component};
use crate::model::{
    AlertLevel, BarangayRiskClass, FloodError, FloodPrediction, ForecastRiskLevel,
    ValidationStatus,
};
use crate::prediction::round_to;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Starting probability for each static risk class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseProbabilities {
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
    pub very_high: f64,
    /// Used when the barangay's class is missing or unrecognized.
    pub unrecognized: f64,
}

impl Default for BaseProbabilities {
    fn default() -> Self {
        Self {
            low: 0.05,
            moderate: 0.15,
            high: 0.35,
            very_high: 0.55,
            unrecognized: 0.15,
        }
    }
}

impl BaseProbabilities {
    pub fn for_class(&self, class: Option<BarangayRiskClass>) -> f64 {
        match class {
            Some(BarangayRiskClass::Low) => self.low,
            Some(BarangayRiskClass::Moderate) => self.moderate,
            Some(BarangayRiskClass::High) => self.high,
            Some(BarangayRiskClass::VeryHigh) => self.very_high,
            None => self.unrecognized,
        }
    }
}

/// A value strictly above `above` adds `add` to the probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub above: f64,
    pub add: f64,
}

/// Probability cutoffs for the 5-level forecast scale (strictly greater than).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskCutoffs {
    pub extreme: f64,
    pub severe: f64,
    pub high: f64,
    pub moderate: f64,
}

impl Default for RiskCutoffs {
    fn default() -> Self {
        Self {
            extreme: 0.7,
            severe: 0.5,
            high: 0.3,
            moderate: 0.15,
        }
    }
}

/// Probability cutoffs for alert escalation (strictly greater than).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertCutoffs {
    pub emergency: f64,
    pub warning: f64,
    pub watch: f64,
}

impl Default for AlertCutoffs {
    fn default() -> Self {
        Self {
            emergency: 0.7,
            warning: 0.4,
            watch: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub model_version: String,
    pub base_probability: BaseProbabilities,
    /// Checked in order; the first step exceeded applies.
    pub rainfall_steps: Vec<Adjustment>,
    pub water_level_steps: Vec<Adjustment>,
    pub max_probability: f64,
    pub risk_cutoffs: RiskCutoffs,
    pub alert_cutoffs: AlertCutoffs,
    pub min_predicted_water_level_m: f64,
    /// Metres of rise per unit probability.
    pub water_level_rise_factor: f64,
    pub rainfall_factor_min: f64,
    pub rainfall_factor_max: f64,
    pub confidence_min: f64,
    pub confidence_max: f64,
    pub affected_area_factor: f64,
    pub population_factor: f64,
    pub default_area_km2: f64,
    pub default_population: u32,
    /// A stored prediction younger than this (and still in its window) is reused.
    pub freshness_minutes: i64,
    /// Reading history considered when building prediction inputs.
    pub lookback_hours: i64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            model_version: "rule-based-v1.0".to_string(),
            base_probability: BaseProbabilities::default(),
            rainfall_steps: vec![
                Adjustment { above: 20.0, add: 0.30 },
                Adjustment { above: 10.0, add: 0.15 },
                Adjustment { above: 5.0, add: 0.05 },
            ],
            water_level_steps: vec![
                Adjustment { above: 2.5, add: 0.25 },
                Adjustment { above: 2.0, add: 0.15 },
                Adjustment { above: 1.8, add: 0.05 },
            ],
            max_probability: 0.95,
            risk_cutoffs: RiskCutoffs::default(),
            alert_cutoffs: AlertCutoffs::default(),
            min_predicted_water_level_m: 1.0,
            water_level_rise_factor: 2.0,
            rainfall_factor_min: 0.8,
            rainfall_factor_max: 1.2,
            confidence_min: 0.65,
            confidence_max: 0.90,
            affected_area_factor: 0.6,
            population_factor: 0.4,
            default_area_km2: 2.5,
            default_population: 5000,
            freshness_minutes: DEFAULT_MAX_AGE_MINUTES,
            lookback_hours: 24,
        }
    }
}

impl PredictionConfig {
    pub fn validate(&self) -> Result<(), FloodError> {
        if let Some((name, value)) = self.float_fields().into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(FloodError::Config(format!(
                "prediction.{} must be a finite number, got {}",
                name, value
            )));
        }
        if !(0.0..=1.0).contains(&self.max_probability) {
            return Err(FloodError::Config(
                "prediction.max_probability must lie in [0, 1]".to_string(),
            ));
        }
        if self.rainfall_factor_min > self.rainfall_factor_max
            || self.confidence_min > self.confidence_max
        {
            return Err(FloodError::Config(
                "prediction random ranges must have min <= max".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_min) || !(0.0..=1.0).contains(&self.confidence_max) {
            return Err(FloodError::Config(
                "prediction confidence range must lie in [0, 1]".to_string(),
            ));
        }
        if self.default_area_km2 < 0.0 {
            return Err(FloodError::Config(
                "prediction.default_area_km2 must not be negative".to_string(),
            ));
        }
        if self.lookback_hours <= 0 {
            return Err(FloodError::Config(
                "prediction.lookback_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Every floating-point setting, by config key.
    fn float_fields(&self) -> Vec<(String, f64)> {
        let b = &self.base_probability;
        let r = &self.risk_cutoffs;
        let a = &self.alert_cutoffs;
        let mut fields: Vec<(String, f64)> = [
            ("base_probability.low", b.low),
            ("base_probability.moderate", b.moderate),
            ("base_probability.high", b.high),
            ("base_probability.very_high", b.very_high),
            ("base_probability.unrecognized", b.unrecognized),
            ("max_probability", self.max_probability),
            ("risk_cutoffs.extreme", r.extreme),
            ("risk_cutoffs.severe", r.severe),
            ("risk_cutoffs.high", r.high),
            ("risk_cutoffs.moderate", r.moderate),
            ("alert_cutoffs.emergency", a.emergency),
            ("alert_cutoffs.warning", a.warning),
            ("alert_cutoffs.watch", a.watch),
            ("min_predicted_water_level_m", self.min_predicted_water_level_m),
            ("water_level_rise_factor", self.water_level_rise_factor),
            ("rainfall_factor_min", self.rainfall_factor_min),
            ("rainfall_factor_max", self.rainfall_factor_max),
            ("confidence_min", self.confidence_min),
            ("confidence_max", self.confidence_max),
            ("affected_area_factor", self.affected_area_factor),
            ("population_factor", self.population_factor),
            ("default_area_km2", self.default_area_km2),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
        for (steps, key) in [
            (&self.rainfall_steps, "rainfall_steps"),
            (&self.water_level_steps, "water_level_steps"),
        ] {
            for (i, step) in steps.iter().enumerate() {
                fields.push((format!("{}[{}].above", key, i), step.above));
                fields.push((format!("{}[{}].add", key, i), step.add));
            }
        }
        fields
    }
}

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

/// Everything about the location and call that the generator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub location_id: String,
    /// `None` when the stored class is missing or unrecognized.
    pub risk_class: Option<BarangayRiskClass>,
    pub area_km2: Option<f64>,
    pub population: Option<u32>,
    pub forecast_hours: i64,
    pub force_refresh: bool,
}

impl PredictionRequest {
    pub fn for_barangay(profile: &BarangayProfile, forecast_hours: i64) -> Self {
        Self {
            location_id: profile.id.clone(),
            risk_class: profile.risk_class(),
            area_km2: profile.area_km2,
            population: profile.population,
            forecast_hours,
            force_refresh: false,
        }
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub prediction: FloodPrediction,
    /// `false` when a fresh stored prediction was returned instead.
    pub generated: bool,
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct PredictionGenerator {
    config: PredictionConfig,
}

impl PredictionGenerator {
    /// Builds a generator, rejecting configurations `generate` cannot run with.
    pub fn new(config: PredictionConfig) -> Result<Self, FloodError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    /// Flood probability, clamped to `[0, max_probability]` and rounded to
    /// three decimals so threshold comparisons behave as written.
    pub fn probability(&self, class: Option<BarangayRiskClass>, inputs: &PredictionInputs) -> f64 {
        let base = self.config.base_probability.for_class(class);
        let raw = base
            + step_adjustment(&self.config.rainfall_steps, inputs.recent_rainfall_mm)
            + step_adjustment(&self.config.water_level_steps, inputs.avg_water_level_m);
        round_to(raw.clamp(0.0, self.config.max_probability), 3)
    }

    pub fn risk_level(&self, probability: f64) -> ForecastRiskLevel {
        let c = &self.config.risk_cutoffs;
        if probability > c.extreme {
            ForecastRiskLevel::Extreme
        } else if probability > c.severe {
            ForecastRiskLevel::Severe
        } else if probability > c.high {
            ForecastRiskLevel::High
        } else if probability > c.moderate {
            ForecastRiskLevel::Moderate
        } else {
            ForecastRiskLevel::Low
        }
    }

    pub fn alert_level(&self, probability: f64) -> Option<AlertLevel> {
        let c = &self.config.alert_cutoffs;
        if probability > c.emergency {
            Some(AlertLevel::Emergency)
        } else if probability > c.warning {
            Some(AlertLevel::Warning)
        } else if probability > c.watch {
            Some(AlertLevel::Watch)
        } else {
            None
        }
    }

    /// Produces a prediction for `request`, or hands back `existing` if it is
    /// a fresh, still-running forecast for the same location and the request
    /// does not force a refresh.
    ///
    /// Nothing is persisted here; see `PredictionService` for the stored path.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        request: &PredictionRequest,
        inputs: &PredictionInputs,
        existing: Option<&FloodPrediction>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<GenerationOutcome, FloodError> {
        let forecast_end = forecast_end(now, request.forecast_hours)?;

        if !request.force_refresh {
            if let Some(current) = existing.filter(|p| {
                p.location_id == request.location_id
                    && is_recent_active_at(p, self.config.freshness_minutes, now)
            }) {
                logging::debug(
                    Component::Predictor,
                    Some(&request.location_id),
                    "recent prediction still active, not generating",
                );
                return Ok(GenerationOutcome {
                    prediction: current.clone(),
                    generated: false,
                });
            }
        }

        let cfg = &self.config;
        let probability = self.probability(request.risk_class, inputs);
        let area_km2 = request.area_km2.unwrap_or(cfg.default_area_km2);
        let population = request.population.unwrap_or(cfg.default_population);

        let predicted_water_level = cfg
            .min_predicted_water_level_m
            .max(inputs.avg_water_level_m + probability * cfg.water_level_rise_factor);
        let rainfall_factor = rng.gen_range(cfg.rainfall_factor_min..=cfg.rainfall_factor_max);
        let confidence = rng.gen_range(cfg.confidence_min..=cfg.confidence_max);
        let population_at_risk = (f64::from(population) * probability * cfg.population_factor).floor() as u32;

        let input_features = json!({
            "risk_class": request.risk_class.map(|c| c.as_str()),
            "base_probability": cfg.base_probability.for_class(request.risk_class),
            "recent_rainfall_mm": inputs.recent_rainfall_mm,
            "avg_water_level_m": inputs.avg_water_level_m,
            "readings_in_window": inputs.readings_in_window,
            "area_km2": area_km2,
            "population": population,
            "forecast_hours": request.forecast_hours,
        });

        let prediction = FloodPrediction {
            id: None,
            location_id: request.location_id.clone(),
            prediction_time: now,
            forecast_start: now,
            forecast_end,
            flood_probability: probability,
            risk_level: self.risk_level(probability),
            predicted_water_level_m: round_to(predicted_water_level, 2),
            predicted_rainfall_mm: round_to(inputs.recent_rainfall_mm * rainfall_factor, 2),
            affected_area_km2: round_to(area_km2 * probability * cfg.affected_area_factor, 2),
            population_at_risk,
            confidence_score: round_to(confidence, 3),
            model_version: cfg.model_version.clone(),
            input_features,
            alert_level: self.alert_level(probability),
            validation_status: ValidationStatus::Pending,
            actual_outcome: None,
            validation_notes: None,
        };

        logging::info(
            Component::Predictor,
            Some(&request.location_id),
            &format!(
                "generated {} forecast (p={:.3}, alert={})",
                prediction.risk_level.as_str(),
                probability,
                prediction.alert_level.map_or("none", |a| a.as_str())
            ),
        );

        Ok(GenerationOutcome {
            prediction,
            generated: true,
        })
    }
}

/// `now + hours`, or `InvalidForecastHorizon` when `hours` is not positive or
/// the end would fall outside chrono's range.
fn forecast_end(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>, FloodError> {
    if hours <= 0 {
        return Err(FloodError::InvalidForecastHorizon(hours));
    }
    Duration::try_hours(hours)
        .and_then(|span| now.checked_add_signed(span))
        .ok_or(FloodError::InvalidForecastHorizon(hours))
}

fn step_adjustment(steps: &[Adjustment], value: f64) -> f64 {
    steps
        .iter()
        .find(|s| value > s.above)
        .map_or(0.0, |s| s.add)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
