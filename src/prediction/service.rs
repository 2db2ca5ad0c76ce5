//! Store-backed prediction workflow.
//!
//! Runs readings → aggregation → freshness lookup → generation → insert for
//! one barangay, and exposes validation and accuracy over the same store.
//! Storage failures are logged and returned to the caller untouched.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::alert::freshness::freshness_cutoff;
use crate::analysis::aggregation::{PredictionInputs, TimeWindow};
use crate::barangays::{find_barangay, BarangayProfile};
use crate::config::ServiceConfig;
use crate::logging;
use crate::model::{EnvironmentalReading, FloodError, FloodPrediction};
use crate::prediction::generator::{GenerationOutcome, PredictionGenerator, PredictionRequest};
use crate::prediction::validation::{compute_accuracy, validate_prediction, AccuracyReport};
use crate::store::PredictionStore;

pub struct PredictionService<S: PredictionStore> {
    store: S,
    generator: PredictionGenerator,
    barangays: Vec<BarangayProfile>,
}

impl<S: PredictionStore> PredictionService<S> {
    /// Fails with `FloodError::Config` if `config` does not validate.
    pub fn new(store: S, config: &ServiceConfig) -> Result<Self, FloodError> {
        config.validate()?;
        Ok(Self {
            store,
            generator: PredictionGenerator::new(config.prediction.clone())?,
            barangays: config.barangays.clone(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn generator(&self) -> &PredictionGenerator {
        &self.generator
    }

    pub fn barangays(&self) -> &[BarangayProfile] {
        &self.barangays
    }

    /// Forecasts for a registered barangay using its stored attributes.
    pub fn predict_for_location<R: Rng + ?Sized>(
        &mut self,
        location_id: &str,
        readings: &[EnvironmentalReading],
        forecast_hours: i64,
        force_refresh: bool,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<GenerationOutcome, FloodError> {
        let profile = find_barangay(&self.barangays, location_id)
            .ok_or_else(|| FloodError::LocationNotFound(location_id.to_string()))?;
        let request = PredictionRequest::for_barangay(profile, forecast_hours).force_refresh(force_refresh);
        self.predict(&request, readings, now, rng)
    }

    /// Forecasts for an explicit request. Readings are restricted to the
    /// configured lookback window ending at `now`.
    ///
    /// The freshness lookup and the insert are separate store calls, so two
    /// concurrent callers can both decide to generate.
    pub fn predict<R: Rng + ?Sized>(
        &mut self,
        request: &PredictionRequest,
        readings: &[EnvironmentalReading],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<GenerationOutcome, FloodError> {
        let location = Some(request.location_id.as_str());
        let window = TimeWindow::last_hours(now, self.generator.config().lookback_hours);
        let inputs = PredictionInputs::from_readings(readings, window);

        let existing = if request.force_refresh {
            None
        } else {
            let since = freshness_cutoff(self.generator.config().freshness_minutes, now);
            self.store
                .find_active(&request.location_id, since, now)
                .inspect_err(|e| logging::log_store_failure(location, "find_active", e))?
        };

        let outcome = self
            .generator
            .generate(request, &inputs, existing.as_ref(), now, rng)?;
        if !outcome.generated {
            return Ok(outcome);
        }

        let stored = self
            .store
            .insert(outcome.prediction)
            .inspect_err(|e| logging::log_store_failure(location, "insert", e))?;
        Ok(GenerationOutcome {
            prediction: stored,
            generated: true,
        })
    }

    pub fn validate(
        &mut self,
        id: i64,
        status: &str,
        actual_outcome: Option<&str>,
        notes: Option<&str>,
    ) -> Result<FloodPrediction, FloodError> {
        validate_prediction(&mut self.store, id, status, actual_outcome, notes)
            .inspect_err(|e| {
                if let FloodError::Storage(_) = e {
                    logging::log_store_failure(None, "set_validation", e);
                }
            })
    }

    pub fn accuracy(
        &mut self,
        model_version: &str,
        evaluation_days: i64,
        location_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AccuracyReport, FloodError> {
        compute_accuracy(&mut self.store, model_version, evaluation_days, location_id, now)
            .inspect_err(|e| {
                if let FloodError::Storage(_) = e {
                    logging::log_store_failure(location_id, "evaluated_since", e);
                }
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForecastRiskLevel, ValidationStatus};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Store whose every call fails, for error propagation checks.
    struct BrokenStore;

    impl PredictionStore for BrokenStore {
        fn insert(&mut self, _: FloodPrediction) -> Result<FloodPrediction, FloodError> {
            Err(FloodError::Storage("connection reset".to_string()))
        }
        fn get(&mut self, _: i64) -> Result<Option<FloodPrediction>, FloodError> {
            Err(FloodError::Storage("connection reset".to_string()))
        }
        fn find_active(
            &mut self,
            _: &str,
            _: DateTime<Utc>,
            _: DateTime<Utc>,
        ) -> Result<Option<FloodPrediction>, FloodError> {
            Ok(None)
        }
        fn set_validation(
            &mut self,
            _: i64,
            _: ValidationStatus,
            _: Option<&str>,
            _: Option<&str>,
        ) -> Result<Option<FloodPrediction>, FloodError> {
            Err(FloodError::Storage("connection reset".to_string()))
        }
        fn evaluated_since(
            &mut self,
            _: &str,
            _: DateTime<Utc>,
            _: Option<&str>,
        ) -> Result<Vec<FloodPrediction>, FloodError> {
            Err(FloodError::Storage("connection reset".to_string()))
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 24, 12, 0, 0).unwrap()
    }

    fn config() -> ServiceConfig {
        ServiceConfig::from_toml_str(
            r#"
            [[barangays]]
            id = "BRGY-001"
            name = "Barangay Tumana"
            area_km2 = 2.0
            population = 10000
            risk_class = "low"
            "#,
        )
        .unwrap()
    }

    fn heavy_rain_readings() -> Vec<EnvironmentalReading> {
        (0..12)
            .map(|h| EnvironmentalReading {
                location_id: "BRGY-001".to_string(),
                timestamp: fixed_now() - Duration::hours(h),
                rainfall_mm: Some(2.5),
                water_level_m: Some(2.6),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_predict_for_location_uses_profile_and_persists() {
        let mut service = PredictionService::new(MemoryStore::new(), &config()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let outcome = service
            .predict_for_location("BRGY-001", &heavy_rain_readings(), 24, false, fixed_now(), &mut rng)
            .unwrap();

        assert!(outcome.generated);
        let p = &outcome.prediction;
        assert_eq!(p.id, Some(1));
        // 0.05 base + 0.30 rain (30mm) + 0.25 water (2.6m)
        assert_eq!(p.flood_probability, 0.6);
        assert_eq!(p.risk_level, ForecastRiskLevel::Severe);
        // floor(10000 * 0.6 * 0.4)
        assert_eq!(p.population_at_risk, 2400);
        assert_eq!(service.store().len(), 1);
    }

    #[test]
    fn test_unknown_location_is_not_found() {
        let mut service = PredictionService::new(MemoryStore::new(), &config()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let err = service
            .predict_for_location("BRGY-404", &[], 24, false, fixed_now(), &mut rng)
            .unwrap_err();
        assert_eq!(err, FloodError::LocationNotFound("BRGY-404".to_string()));
    }

    #[test]
    fn test_storage_failure_propagates_unchanged() {
        let mut service = PredictionService::new(BrokenStore, &config()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let err = service
            .predict_for_location("BRGY-001", &[], 24, false, fixed_now(), &mut rng)
            .unwrap_err();
        assert_eq!(err, FloodError::Storage("connection reset".to_string()));

        let err = service.accuracy("rule-based-v1.0", 30, None, fixed_now()).unwrap_err();
        assert_eq!(err, FloodError::Storage("connection reset".to_string()));
    }

    #[test]
    fn test_validation_status_checked_before_storage() {
        let mut service = PredictionService::new(BrokenStore, &config()).unwrap();
        let err = service.validate(1, "maybe", None, None).unwrap_err();
        assert!(matches!(err, FloodError::InvalidValidationStatus { .. }));
    }

    #[test]
    fn test_unvalidated_config_is_rejected() {
        let mut config = config();
        config.prediction.confidence_min = 0.95;
        config.prediction.confidence_max = 0.65;
        let err = PredictionService::new(MemoryStore::new(), &config).err();
        assert!(matches!(err, Some(FloodError::Config(_))), "got {:?}", err);
    }

    #[test]
    fn test_oversized_horizon_is_rejected_without_storing() {
        let mut service = PredictionService::new(MemoryStore::new(), &config()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let hours = i64::MAX / 1000;
        let err = service
            .predict_for_location("BRGY-001", &heavy_rain_readings(), hours, false, fixed_now(), &mut rng)
            .unwrap_err();
        assert_eq!(err, FloodError::InvalidForecastHorizon(hours));
        assert!(service.store().is_empty());
    }
}
