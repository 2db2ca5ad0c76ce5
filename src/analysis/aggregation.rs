//! Time-windowed reading aggregation.
//!
//! The backing store does not guarantee reading order, so nothing here
//! assumes the input slice is sorted: "latest" and "most recent N" are
//! always resolved by timestamp.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::logging::{self, Component};
use crate::model::{EnvironmentalReading, Parameter};

/// Number of most recent rainfall observations summed for a forecast.
/// Readings with no usable rainfall value are not counted, so the sum can
/// reach further back than the last 12 readings.
pub const RECENT_RAINFALL_POINTS: usize = 12;

// ---------------------------------------------------------------------------
// Window types
// ---------------------------------------------------------------------------

/// Closed interval `[start, end]` of reading timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `hours` leading up to and including `now`. A span reaching past
    /// the earliest representable time starts there instead.
    pub fn last_hours(now: DateTime<Utc>, hours: i64) -> Self {
        let start = Duration::try_hours(hours)
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::new(start, now)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Summary statistics for one parameter over a window.
///
/// `sum` is 0 and every optional field is `None` when no reading in the
/// window carried a usable value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ParameterStats {
    pub count: usize,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub average: Option<f64>,
    pub latest: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub parameters: BTreeMap<Parameter, ParameterStats>,
}

impl AggregatedWindow {
    /// Stats for `parameter`, or the empty shape if it was not requested.
    pub fn stats(&self, parameter: Parameter) -> ParameterStats {
        self.parameters.get(&parameter).copied().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Reduces `readings` inside `window` into per-parameter statistics.
///
/// Missing, NaN and infinite values are skipped; the average is taken over the values
/// actually present. A parameter with no usable value yields the empty
/// shape rather than an error.
pub fn aggregate(
    readings: &[EnvironmentalReading],
    window: TimeWindow,
    parameters: &[Parameter],
) -> AggregatedWindow {
    let mut out = BTreeMap::new();

    for &parameter in parameters {
        let stats = parameter_stats(readings, window, parameter);
        if stats.count == 0 {
            logging::debug(
                Component::Aggregator,
                None,
                &format!("no {} values in window", parameter.as_str()),
            );
        }
        out.insert(parameter, stats);
    }

    AggregatedWindow {
        start: window.start,
        end: window.end,
        parameters: out,
    }
}

fn values_in_window<'a>(
    readings: &'a [EnvironmentalReading],
    window: TimeWindow,
    parameter: Parameter,
) -> impl Iterator<Item = (DateTime<Utc>, f64)> + 'a {
    readings
        .iter()
        .filter(move |r| window.contains(r.timestamp))
        .filter_map(move |r| parameter.value_of(r).map(|v| (r.timestamp, v)))
}

fn parameter_stats(
    readings: &[EnvironmentalReading],
    window: TimeWindow,
    parameter: Parameter,
) -> ParameterStats {
    let mut stats = ParameterStats::default();
    let mut latest: Option<(DateTime<Utc>, f64)> = None;

    for (timestamp, value) in values_in_window(readings, window, parameter) {
        stats.count += 1;
        stats.sum += value;
        stats.min = Some(stats.min.map_or(value, |m| m.min(value)));
        stats.max = Some(stats.max.map_or(value, |m| m.max(value)));
        // Ties keep the later element in input order.
        if latest.is_none_or(|(t, _)| timestamp >= t) {
            latest = Some((timestamp, value));
        }
    }

    if stats.count > 0 {
        stats.average = Some(stats.sum / stats.count as f64);
        stats.latest = latest.map(|(_, v)| v);
    }
    stats
}

/// Sums the `n` most recent usable values of `parameter` inside `window`.
pub fn recent_sum(
    readings: &[EnvironmentalReading],
    window: TimeWindow,
    parameter: Parameter,
    n: usize,
) -> f64 {
    let mut values: Vec<(DateTime<Utc>, f64)> =
        values_in_window(readings, window, parameter).collect();
    values.sort_by(|a, b| b.0.cmp(&a.0));
    values.iter().take(n).map(|(_, v)| v).sum()
}

// ---------------------------------------------------------------------------
// Prediction inputs
// ---------------------------------------------------------------------------

/// The two trend figures the prediction generator works from.
///
/// Missing data contributes 0 to both figures, which adds nothing to the
/// forecast probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionInputs {
    /// Sum over the most recent `RECENT_RAINFALL_POINTS` rainfall values.
    pub recent_rainfall_mm: f64,
    /// Mean water level over the whole window.
    pub avg_water_level_m: f64,
    /// Readings that fell inside the window.
    pub readings_in_window: usize,
}

impl PredictionInputs {
    pub fn new(recent_rainfall_mm: f64, avg_water_level_m: f64) -> Self {
        Self {
            recent_rainfall_mm,
            avg_water_level_m,
            readings_in_window: 0,
        }
    }

    pub fn from_readings(readings: &[EnvironmentalReading], window: TimeWindow) -> Self {
        let aggregated = aggregate(readings, window, &[Parameter::WaterLevel]);
        Self {
            recent_rainfall_mm: recent_sum(
                readings,
                window,
                Parameter::Rainfall,
                RECENT_RAINFALL_POINTS,
            ),
            avg_water_level_m: aggregated.stats(Parameter::WaterLevel).average.unwrap_or(0.0),
            readings_in_window: readings.iter().filter(|r| window.contains(r.timestamp)).count(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
