/// Core data types for the barangay flood monitoring service.
///
/// This module defines the shared domain model imported by all other modules:
/// environmental readings, flood characteristics records, flood predictions,
/// the three distinct risk scales and the crate-wide error type.
/// Apart from record construction checks it contains no logic and no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A single environmental observation for one location.
///
/// Every measurement is optional: sensors drop out, and seed data only fills
/// the columns a given station actually reports.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvironmentalReading {
    pub location_id: String,
    pub timestamp: DateTime<Utc>,
    pub rainfall_mm: Option<f64>,
    pub water_level_m: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub soil_moisture_pct: Option<f64>,
    pub wind_speed_kph: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub quality_flag: Option<String>, // "good", "suspect", ...
}

/// Measured quantities an `EnvironmentalReading` can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Rainfall,
    WaterLevel,
    Temperature,
    Humidity,
    Pressure,
    SoilMoisture,
    WindSpeed,
    WindDirection,
}

impl Parameter {
    pub const ALL: [Parameter; 8] = [
        Parameter::Rainfall,
        Parameter::WaterLevel,
        Parameter::Temperature,
        Parameter::Humidity,
        Parameter::Pressure,
        Parameter::SoilMoisture,
        Parameter::WindSpeed,
        Parameter::WindDirection,
    ];

    /// Extracts this parameter's value from a reading. NaN and infinite
    /// values count as missing.
    pub fn value_of(self, reading: &EnvironmentalReading) -> Option<f64> {
        let raw = match self {
            Parameter::Rainfall => reading.rainfall_mm,
            Parameter::WaterLevel => reading.water_level_m,
            Parameter::Temperature => reading.temperature_c,
            Parameter::Humidity => reading.humidity_pct,
            Parameter::Pressure => reading.pressure_hpa,
            Parameter::SoilMoisture => reading.soil_moisture_pct,
            Parameter::WindSpeed => reading.wind_speed_kph,
            Parameter::WindDirection => reading.wind_direction_deg,
        };
        raw.filter(|v| v.is_finite())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Parameter::Rainfall => "rainfall",
            Parameter::WaterLevel => "water_level",
            Parameter::Temperature => "temperature",
            Parameter::Humidity => "humidity",
            Parameter::Pressure => "pressure",
            Parameter::SoilMoisture => "soil_moisture",
            Parameter::WindSpeed => "wind_speed",
            Parameter::WindDirection => "wind_direction",
        }
    }
}

impl FromStr for Parameter {
    type Err = FloodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| FloodError::UnknownParameter(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Risk scales
// ---------------------------------------------------------------------------
//
// Three scales coexist and are deliberately not converted into one another:
//   BarangayRiskClass       static hazard class of a location (4 values)
//   CharacteristicRiskLevel scored hydrological severity (4 values)
//   ForecastRiskLevel       dynamic forecast severity (5 values)

/// Static flood hazard classification of a barangay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarangayRiskClass {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl BarangayRiskClass {
    pub fn as_str(self) -> &'static str {
        match self {
            BarangayRiskClass::Low => "low",
            BarangayRiskClass::Moderate => "moderate",
            BarangayRiskClass::High => "high",
            BarangayRiskClass::VeryHigh => "very_high",
        }
    }
}

impl FromStr for BarangayRiskClass {
    type Err = FloodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(BarangayRiskClass::Low),
            "moderate" => Ok(BarangayRiskClass::Moderate),
            "high" => Ok(BarangayRiskClass::High),
            "very_high" => Ok(BarangayRiskClass::VeryHigh),
            other => Err(FloodError::UnknownVariant {
                kind: "barangay risk class",
                value: other.to_string(),
            }),
        }
    }
}

/// Severity of a flood characteristics record, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicRiskLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl CharacteristicRiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            CharacteristicRiskLevel::Low => "low",
            CharacteristicRiskLevel::Moderate => "moderate",
            CharacteristicRiskLevel::High => "high",
            CharacteristicRiskLevel::Extreme => "extreme",
        }
    }
}

impl FromStr for CharacteristicRiskLevel {
    type Err = FloodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(CharacteristicRiskLevel::Low),
            "moderate" => Ok(CharacteristicRiskLevel::Moderate),
            "high" => Ok(CharacteristicRiskLevel::High),
            "extreme" => Ok(CharacteristicRiskLevel::Extreme),
            other => Err(FloodError::UnknownVariant {
                kind: "characteristic risk level",
                value: other.to_string(),
            }),
        }
    }
}

/// Severity of a flood forecast, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastRiskLevel {
    Low,
    Moderate,
    High,
    Severe,
    Extreme,
}

impl ForecastRiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ForecastRiskLevel::Low => "low",
            ForecastRiskLevel::Moderate => "moderate",
            ForecastRiskLevel::High => "high",
            ForecastRiskLevel::Severe => "severe",
            ForecastRiskLevel::Extreme => "extreme",
        }
    }
}

impl FromStr for ForecastRiskLevel {
    type Err = FloodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(ForecastRiskLevel::Low),
            "moderate" => Ok(ForecastRiskLevel::Moderate),
            "high" => Ok(ForecastRiskLevel::High),
            "severe" => Ok(ForecastRiskLevel::Severe),
            "extreme" => Ok(ForecastRiskLevel::Extreme),
            other => Err(FloodError::UnknownVariant {
                kind: "forecast risk level",
                value: other.to_string(),
            }),
        }
    }
}

/// Escalation tag attached to a forecast. Absence of an alert is `None`
/// at the use site, not a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Watch,
    Warning,
    Emergency,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Watch => "watch",
            AlertLevel::Warning => "warning",
            AlertLevel::Emergency => "emergency",
        }
    }
}

impl FromStr for AlertLevel {
    type Err = FloodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "watch" => Ok(AlertLevel::Watch),
            "warning" => Ok(AlertLevel::Warning),
            "emergency" => Ok(AlertLevel::Emergency),
            other => Err(FloodError::UnknownVariant {
                kind: "alert level",
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Validated,
    FalsePositive,
    FalseNegative,
}

impl ValidationStatus {
    /// Statuses an operator may assign. `Pending` is only ever the initial state.
    pub const OPERATOR_ASSIGNABLE: [ValidationStatus; 3] = [
        ValidationStatus::Validated,
        ValidationStatus::FalsePositive,
        ValidationStatus::FalseNegative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Validated => "validated",
            ValidationStatus::FalsePositive => "false_positive",
            ValidationStatus::FalseNegative => "false_negative",
        }
    }

    /// Parses a status supplied by an operator, rejecting `pending` and any
    /// unknown value with the list of accepted values.
    pub fn parse_operator_status(s: &str) -> Result<Self, FloodError> {
        Self::OPERATOR_ASSIGNABLE
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| FloodError::InvalidValidationStatus {
                given: s.to_string(),
                allowed: Self::OPERATOR_ASSIGNABLE.iter().map(|v| v.as_str()).collect(),
            })
    }
}

impl FromStr for ValidationStatus {
    type Err = FloodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "pending" {
            return Ok(ValidationStatus::Pending);
        }
        Self::parse_operator_status(s)
    }
}

// ---------------------------------------------------------------------------
// Flood characteristics
// ---------------------------------------------------------------------------

/// A magnitude together with its modelled uncertainty (same unit).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Estimate {
    pub value: f64,
    pub uncertainty: f64,
}

impl Estimate {
    pub fn new(value: f64, uncertainty: f64) -> Self {
        Self { value, uncertainty }
    }
}

/// Modelled hydrological characteristics of a flood at one location.
///
/// Construct through `FloodCharacteristics::new`, which rejects negative,
/// NaN and infinite magnitudes so that scoring never sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodCharacteristics {
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub max_depth_m: Estimate,
    pub peak_velocity_ms: Estimate,
    pub arrival_time_hours: Estimate,
    pub inundation_area_km2: Estimate,
    pub risk_level: CharacteristicRiskLevel,
    pub model_version: String,
    pub is_active: bool,
    pub expert_analysis: Option<String>,
    pub recommended_actions: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// The measured part of a characteristics record, checked on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Magnitudes {
    pub max_depth_m: Estimate,
    pub peak_velocity_ms: Estimate,
    pub arrival_time_hours: Estimate,
    pub inundation_area_km2: Estimate,
}

impl FloodCharacteristics {
    pub fn new(
        location_name: impl Into<String>,
        (latitude, longitude): (f64, f64),
        magnitudes: Magnitudes,
        risk_level: CharacteristicRiskLevel,
        model_version: impl Into<String>,
        last_updated: DateTime<Utc>,
    ) -> Result<Self, FloodError> {
        let checks = [
            ("max_depth", magnitudes.max_depth_m),
            ("peak_velocity", magnitudes.peak_velocity_ms),
            ("arrival_time", magnitudes.arrival_time_hours),
            ("inundation_area", magnitudes.inundation_area_km2),
        ];
        for (field, estimate) in checks {
            check_magnitude(field, estimate.value)?;
            check_magnitude(field, estimate.uncertainty)?;
        }

        Ok(Self {
            location_name: location_name.into(),
            latitude,
            longitude,
            max_depth_m: magnitudes.max_depth_m,
            peak_velocity_ms: magnitudes.peak_velocity_ms,
            arrival_time_hours: magnitudes.arrival_time_hours,
            inundation_area_km2: magnitudes.inundation_area_km2,
            risk_level,
            model_version: model_version.into(),
            is_active: true,
            expert_analysis: None,
            recommended_actions: None,
            last_updated,
        })
    }
}

fn check_magnitude(field: &'static str, value: f64) -> Result<(), FloodError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FloodError::InvalidMagnitude { field, value })
    }
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

/// A flood forecast for one location over `[forecast_start, forecast_end)`.
///
/// `id` is `None` until the record has been persisted by a `PredictionStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodPrediction {
    pub id: Option<i64>,
    pub location_id: String,
    pub prediction_time: DateTime<Utc>,
    pub forecast_start: DateTime<Utc>,
    pub forecast_end: DateTime<Utc>,
    pub flood_probability: f64,
    pub risk_level: ForecastRiskLevel,
    pub predicted_water_level_m: f64,
    pub predicted_rainfall_mm: f64,
    pub affected_area_km2: f64,
    pub population_at_risk: u32,
    pub confidence_score: f64,
    pub model_version: String,
    pub input_features: serde_json::Value,
    pub alert_level: Option<AlertLevel>,
    pub validation_status: ValidationStatus,
    pub actual_outcome: Option<String>,
    pub validation_notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors surfaced by the scoring, prediction and validation core.
#[derive(Debug, PartialEq)]
pub enum FloodError {
    /// An operator supplied a validation status outside the accepted set.
    InvalidValidationStatus { given: String, allowed: Vec<&'static str> },
    /// No prediction exists with the given identifier.
    PredictionNotFound(i64),
    /// No barangay profile exists with the given identifier.
    LocationNotFound(String),
    /// A characteristics magnitude was negative, NaN or infinite.
    InvalidMagnitude { field: &'static str, value: f64 },
    /// Forecast horizon must be a positive number of hours that keeps the
    /// forecast end representable.
    InvalidForecastHorizon(i64),
    /// Accuracy evaluation window must be a positive, representable number
    /// of days.
    InvalidEvaluationWindow(i64),
    /// A parameter name did not match any known reading column.
    UnknownParameter(String),
    /// A stored or configured enum string did not match any variant.
    UnknownVariant { kind: &'static str, value: String },
    /// Configuration file could not be read or parsed.
    Config(String),
    /// The backing store failed; the message is the store's own.
    Storage(String),
}

impl fmt::Display for FloodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloodError::InvalidValidationStatus { given, allowed } => write!(
                f,
                "Invalid validation status '{}': expected one of {}",
                given,
                allowed.join(", ")
            ),
            FloodError::PredictionNotFound(id) => write!(f, "Prediction not found: {}", id),
            FloodError::LocationNotFound(id) => write!(f, "Location not found: {}", id),
            FloodError::InvalidMagnitude { field, value } => {
                write!(f, "Invalid {}: {} (must be finite and non-negative)", field, value)
            }
            FloodError::InvalidForecastHorizon(hours) => {
                write!(f, "Invalid forecast horizon: {} hours", hours)
            }
            FloodError::InvalidEvaluationWindow(days) => {
                write!(f, "Invalid evaluation window: {} days", days)
            }
            FloodError::UnknownParameter(name) => write!(f, "Unknown parameter: {}", name),
            FloodError::UnknownVariant { kind, value } => {
                write!(f, "Unknown {}: {}", kind, value)
            }
            FloodError::Config(msg) => write!(f, "Config error: {}", msg),
            FloodError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for FloodError {}

impl From<postgres::Error> for FloodError {
    fn from(err: postgres::Error) -> Self {
        FloodError::Storage(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
