//! Operator validation of predictions and accuracy evaluation.
//!
//! Operators mark each forecast as `validated` (it happened as predicted),
//! `false_positive` or `false_negative`. Accuracy is computed over the
//! predictions that have received such feedback; pending ones are ignored.
//! Every quotient with a zero denominator is reported as 0.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::logging::{self, Component};
use crate::model::{FloodError, FloodPrediction, ValidationStatus};
use crate::prediction::round_to;
use crate::store::PredictionStore;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Records operator feedback on prediction `id`.
///
/// `status` must be one of `validated`, `false_positive`, `false_negative`;
/// the status is checked before the store is touched. Outcome and notes are
/// only overwritten when supplied.
pub fn validate_prediction<S: PredictionStore + ?Sized>(
    store: &mut S,
    id: i64,
    status: &str,
    actual_outcome: Option<&str>,
    notes: Option<&str>,
) -> Result<FloodPrediction, FloodError> {
    let status = ValidationStatus::parse_operator_status(status)?;

    let updated = store
        .set_validation(id, status, actual_outcome, notes)?
        .ok_or(FloodError::PredictionNotFound(id))?;

    logging::info(
        Component::Validator,
        Some(&updated.location_id),
        &format!("prediction {} marked {}", id, status.as_str()),
    );
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Accuracy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub total_evaluated: usize,
    pub accurate: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub average_confidence: f64,
    pub evaluation_days: i64,
}

impl AccuracyReport {
    /// Builds a report from already-selected predictions. Pending entries are
    /// skipped, so callers may pass an unfiltered set.
    pub fn from_predictions(predictions: &[FloodPrediction], evaluation_days: i64) -> Self {
        let evaluated: Vec<&FloodPrediction> = predictions
            .iter()
            .filter(|p| p.validation_status != ValidationStatus::Pending)
            .collect();

        let count = |status: ValidationStatus| {
            evaluated
                .iter()
                .filter(|p| p.validation_status == status)
                .count()
        };
        let accurate = count(ValidationStatus::Validated);
        let false_positives = count(ValidationStatus::FalsePositive);
        let false_negatives = count(ValidationStatus::FalseNegative);
        let total = evaluated.len();
        let confidence_sum: f64 = evaluated.iter().map(|p| p.confidence_score).sum();

        Self {
            total_evaluated: total,
            accurate,
            false_positives,
            false_negatives,
            accuracy: ratio(accurate as f64, total as f64),
            precision: ratio(accurate as f64, (accurate + false_positives) as f64),
            recall: ratio(accurate as f64, (accurate + false_negatives) as f64),
            average_confidence: ratio(confidence_sum, total as f64),
            evaluation_days,
        }
    }
}

fn evaluation_start(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, FloodError> {
    if days <= 0 {
        return Err(FloodError::InvalidEvaluationWindow(days));
    }
    Duration::try_days(days)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or(FloodError::InvalidEvaluationWindow(days))
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        round_to(numerator / denominator, 3)
    }
}

/// Evaluates `model_version` over predictions made in the `evaluation_days`
/// before `now`, optionally restricted to one location.
///
/// `evaluation_days` must be positive and small enough that the window start
/// is a representable time, otherwise `InvalidEvaluationWindow`.
pub fn compute_accuracy<S: PredictionStore + ?Sized>(
    store: &mut S,
    model_version: &str,
    evaluation_days: i64,
    location_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AccuracyReport, FloodError> {
    let since = evaluation_start(now, evaluation_days)?;
    let predictions = store.evaluated_since(model_version, since, location_id)?;
    let report = AccuracyReport::from_predictions(&predictions, evaluation_days);
    logging::log_accuracy_summary(model_version, &report);
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ForecastRiskLevel;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap()
    }

    fn prediction(location: &str, days_ago: i64, confidence: f64) -> FloodPrediction {
        let made = fixed_now() - Duration::days(days_ago);
        FloodPrediction {
            id: None,
            location_id: location.to_string(),
            prediction_time: made,
            forecast_start: made,
            forecast_end: made + Duration::hours(24),
            flood_probability: 0.4,
            risk_level: ForecastRiskLevel::High,
            predicted_water_level_m: 2.2,
            predicted_rainfall_mm: 14.0,
            affected_area_km2: 0.6,
            population_at_risk: 800,
            confidence_score: confidence,
            model_version: "rule-based-v1.0".to_string(),
            input_features: serde_json::Value::Null,
            alert_level: None,
            validation_status: ValidationStatus::Pending,
            actual_outcome: None,
            validation_notes: None,
        }
    }

    fn with_status(status: ValidationStatus, confidence: f64) -> FloodPrediction {
        let mut p = prediction("BRGY-003", 1, confidence);
        p.validation_status = status;
        p
    }

    // --- Report arithmetic --------------------------------------------------

    #[test]
    fn test_six_two_two_split() {
        let mut preds = Vec::new();
        preds.extend((0..6).map(|_| with_status(ValidationStatus::Validated, 0.8)));
        preds.extend((0..2).map(|_| with_status(ValidationStatus::FalsePositive, 0.7)));
        preds.extend((0..2).map(|_| with_status(ValidationStatus::FalseNegative, 0.7)));

        let r = AccuracyReport::from_predictions(&preds, 30);
        assert_eq!(r.total_evaluated, 10);
        assert_eq!(r.accuracy, 0.6);
        assert_eq!(r.precision, 0.75);
        assert_eq!(r.recall, 0.75);
        assert_eq!(r.average_confidence, 0.76);
    }

    #[test]
    fn test_empty_set_reports_zeros() {
        let r = AccuracyReport::from_predictions(&[], 30);
        assert_eq!(r.total_evaluated, 0);
        assert_eq!(r.accuracy, 0.0);
        assert_eq!(r.precision, 0.0);
        assert_eq!(r.recall, 0.0);
        assert_eq!(r.average_confidence, 0.0);
    }

    #[test]
    fn test_pending_predictions_are_excluded() {
        let preds = vec![
            with_status(ValidationStatus::Validated, 0.9),
            with_status(ValidationStatus::Pending, 0.1),
        ];
        let r = AccuracyReport::from_predictions(&preds, 7);
        assert_eq!(r.total_evaluated, 1);
        assert_eq!(r.accuracy, 1.0);
        assert_eq!(r.average_confidence, 0.9);
    }

    #[test]
    fn test_only_false_negatives_gives_zero_precision_without_error() {
        let preds = vec![with_status(ValidationStatus::FalseNegative, 0.7)];
        let r = AccuracyReport::from_predictions(&preds, 7);
        assert_eq!(r.precision, 0.0, "0/0 precision resolves to 0");
        assert_eq!(r.recall, 0.0);
        assert_eq!(r.accuracy, 0.0);
    }

    #[test]
    fn test_quotients_rounded_to_three_places() {
        let preds = vec![
            with_status(ValidationStatus::Validated, 0.7),
            with_status(ValidationStatus::Validated, 0.7),
            with_status(ValidationStatus::FalsePositive, 0.7),
        ];
        let r = AccuracyReport::from_predictions(&preds, 7);
        assert_eq!(r.accuracy, 0.667);
        assert_eq!(r.precision, 0.667);
        assert_eq!(r.recall, 1.0);
    }

    // --- Store-backed -------------------------------------------------------

    #[test]
    fn test_validate_unknown_status_fails_before_lookup() {
        let mut store = MemoryStore::new();
        let err = validate_prediction(&mut store, 42, "maybe", None, None).unwrap_err();
        assert_eq!(
            err,
            FloodError::InvalidValidationStatus {
                given: "maybe".to_string(),
                allowed: vec!["validated", "false_positive", "false_negative"],
            }
        );
    }

    #[test]
    fn test_validate_missing_prediction_is_not_found() {
        let mut store = MemoryStore::new();
        let err = validate_prediction(&mut store, 42, "validated", None, None).unwrap_err();
        assert_eq!(err, FloodError::PredictionNotFound(42));
    }

    #[test]
    fn test_validate_updates_only_target_prediction() {
        let mut store = MemoryStore::new();
        let a = store.insert(prediction("BRGY-003", 1, 0.8)).unwrap();
        let b = store.insert(prediction("BRGY-003", 1, 0.8)).unwrap();

        let updated = validate_prediction(
            &mut store,
            a.id.unwrap(),
            "false_positive",
            Some("No flooding observed"),
            Some("Checked by field team"),
        )
        .unwrap();
        assert_eq!(updated.validation_status, ValidationStatus::FalsePositive);
        assert_eq!(updated.actual_outcome.as_deref(), Some("No flooding observed"));
        assert_eq!(updated.validation_notes.as_deref(), Some("Checked by field team"));

        let untouched = store.get(b.id.unwrap()).unwrap().unwrap();
        assert_eq!(untouched.validation_status, ValidationStatus::Pending);
    }

    #[test]
    fn test_compute_accuracy_applies_window_model_and_location() {
        let mut store = MemoryStore::new();
        let entries = [
            ("BRGY-003", 2, ValidationStatus::Validated, "rule-based-v1.0"),
            ("BRGY-003", 5, ValidationStatus::FalsePositive, "rule-based-v1.0"),
            ("BRGY-008", 3, ValidationStatus::Validated, "rule-based-v1.0"),
            ("BRGY-003", 45, ValidationStatus::FalseNegative, "rule-based-v1.0"), // outside window
            ("BRGY-003", 1, ValidationStatus::FalseNegative, "ml-v2"),            // other model
            ("BRGY-003", 1, ValidationStatus::Pending, "rule-based-v1.0"),
        ];
        for (loc, days, status, model) in entries {
            let mut p = prediction(loc, days, 0.8);
            p.validation_status = status;
            p.model_version = model.to_string();
            store.insert(p).unwrap();
        }

        let all = compute_accuracy(&mut store, "rule-based-v1.0", 30, None, fixed_now()).unwrap();
        assert_eq!(all.total_evaluated, 3);
        assert_eq!(all.accurate, 2);
        assert_eq!(all.false_positives, 1);

        let one = compute_accuracy(&mut store, "rule-based-v1.0", 30, Some("BRGY-003"), fixed_now()).unwrap();
        assert_eq!(one.total_evaluated, 2);
        assert_eq!(one.accuracy, 0.5);
        assert_eq!(one.precision, 0.5);
        assert_eq!(one.recall, 1.0);
    }

    #[test]
    fn test_compute_accuracy_rejects_bad_evaluation_window() {
        let mut store = MemoryStore::new();
        store.insert(prediction("BRGY-003", 1, 0.8)).unwrap();
        for days in [0, -5, i64::MAX / 1000] {
            let result = compute_accuracy(&mut store, "rule-based-v1.0", days, None, fixed_now());
            assert_eq!(result, Err(FloodError::InvalidEvaluationWindow(days)));
        }
    }
}
