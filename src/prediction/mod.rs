//! Flood forecasting and forecast evaluation.
//!
//! - `generator`: rule-based probability, risk and alert derivation.
//! - `validation`: operator feedback and accuracy metrics.
//! - `service`: store-backed orchestration of the two.

pub mod generator;
pub mod service;
pub mod validation;

/// Rounds `value` to `places` decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::round_to;

    #[test]
    fn test_round_to_three_places() {
        assert_eq!(round_to(0.05 + 0.30 + 0.25, 3), 0.6);
        assert_eq!(round_to(2.0 / 3.0, 3), 0.667);
        assert_eq!(round_to(0.0, 3), 0.0);
    }
}
