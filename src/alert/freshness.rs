/// Prediction freshness detection.
///
/// A forecast stays authoritative for a location until it is either too old
/// or its forecast window has run out. While it is fresh, the generator hands
/// it back instead of appending a near-duplicate.
///
/// # Clock injection
/// All functions accept a `now: DateTime<Utc>` parameter rather than calling
/// `Utc::now()` internally. This keeps freshness purely deterministic in
/// tests without mocking or time manipulation.

use chrono::{DateTime, Duration, Utc};

use crate::model::FloodPrediction;

/// Default age limit for reusing a stored prediction: two hours.
pub const DEFAULT_MAX_AGE_MINUTES: i64 = 120;

// ---------------------------------------------------------------------------
// Freshness check
// ---------------------------------------------------------------------------

/// Returns `true` if `prediction` was made no more than `max_age_minutes`
/// before `now` and its forecast window has not yet ended.
///
/// Age is inclusive of the limit:
///   age <= max_age_minutes  →  recent
///   age >  max_age_minutes  →  not recent
///
/// The window is half-open, so a forecast ending exactly at `now` is over.
/// A limit too large to express as a duration never expires anything.
pub fn is_recent_active_at(
    prediction: &FloodPrediction,
    max_age_minutes: i64,
    now: DateTime<Utc>,
) -> bool {
    let age = now - prediction.prediction_time;
    let within_age = Duration::try_minutes(max_age_minutes).is_none_or(|limit| age <= limit);
    within_age && prediction.forecast_end > now
}

/// Earliest `prediction_time` still inside the age limit, clamped to the
/// earliest representable time.
pub fn freshness_cutoff(max_age_minutes: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    Duration::try_minutes(max_age_minutes)
        .and_then(|limit| now.checked_sub_signed(limit))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForecastRiskLevel, ValidationStatus};
    use chrono::TimeZone;

    /// A fixed "now" used across all tests: 2024-07-24 13:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 24, 13, 0, 0).unwrap()
    }

    fn prediction_made(minutes_ago: i64, horizon_hours: i64) -> FloodPrediction {
        let made = fixed_now() - Duration::minutes(minutes_ago);
        FloodPrediction {
            id: Some(1),
            location_id: "BRGY-007".to_string(),
            prediction_time: made,
            forecast_start: made,
            forecast_end: made + Duration::hours(horizon_hours),
            flood_probability: 0.2,
            risk_level: ForecastRiskLevel::Moderate,
            predicted_water_level_m: 1.4,
            predicted_rainfall_mm: 6.0,
            affected_area_km2: 0.3,
            population_at_risk: 400,
            confidence_score: 0.8,
            model_version: "rule-based-v1.0".to_string(),
            input_features: serde_json::Value::Null,
            alert_level: None,
            validation_status: ValidationStatus::Pending,
            actual_outcome: None,
            validation_notes: None,
        }
    }

    // --- Recent -------------------------------------------------------------

    #[test]
    fn test_prediction_30_minutes_old_is_recent() {
        let p = prediction_made(30, 24);
        assert!(is_recent_active_at(&p, DEFAULT_MAX_AGE_MINUTES, fixed_now()));
    }

    #[test]
    fn test_prediction_exactly_at_age_limit_is_recent() {
        let p = prediction_made(120, 24);
        assert!(
            is_recent_active_at(&p, 120, fixed_now()),
            "prediction exactly 120 minutes old is still within the limit"
        );
    }

    // --- Not recent ---------------------------------------------------------

    #[test]
    fn test_prediction_one_minute_past_limit_is_not_recent() {
        let p = prediction_made(121, 24);
        assert!(!is_recent_active_at(&p, 120, fixed_now()));
    }

    #[test]
    fn test_expired_forecast_window_is_not_recent() {
        // Made 90 minutes ago with a one-hour horizon: window ended 30 min ago.
        let p = prediction_made(90, 1);
        assert!(!is_recent_active_at(&p, 120, fixed_now()));
    }

    #[test]
    fn test_window_ending_now_is_over() {
        let p = prediction_made(60, 1);
        assert_eq!(p.forecast_end, fixed_now());
        assert!(!is_recent_active_at(&p, 120, fixed_now()));
    }

    // --- Threshold variation ------------------------------------------------

    #[test]
    fn test_same_prediction_recent_under_loose_limit_only() {
        let p = prediction_made(45, 24);
        assert!(!is_recent_active_at(&p, 30, fixed_now()));
        assert!(is_recent_active_at(&p, 60, fixed_now()));
    }

    // --- Extreme limits -----------------------------------------------------

    #[test]
    fn test_huge_age_limit_does_not_panic() {
        let p = prediction_made(60 * 24 * 365, 24 * 400);
        assert!(is_recent_active_at(&p, i64::MAX, fixed_now()));
        assert_eq!(freshness_cutoff(i64::MAX / 1000, fixed_now()), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_cutoff_is_now_minus_limit() {
        assert_eq!(
            freshness_cutoff(120, fixed_now()),
            fixed_now() - Duration::minutes(120)
        );
    }
}
