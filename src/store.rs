/// Persistence for flood predictions.
///
/// The prediction core touches storage in exactly three ways: appending a
/// new prediction, recording operator validation, and selecting evaluated
/// predictions for accuracy reports. `PredictionStore` captures those plus
/// the lookups the freshness guard needs.
///
/// Two implementations:
/// - `MemoryStore`: in-process, used by tests and embedding callers.
/// - `PgPredictionStore`: PostgreSQL via the `flood_predictions` table
///   (`sql/001_flood_predictions.sql`).
///
/// The freshness guard reads with `find_active` and then writes with
/// `insert`; neither implementation makes that pair atomic.

use chrono::{DateTime, Utc};
use postgres::{Client, NoTls, Row};
use std::env;

use crate::model::{FloodError, FloodPrediction, ValidationStatus};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

pub trait PredictionStore {
    /// Appends `prediction`, returning it with its assigned id.
    fn insert(&mut self, prediction: FloodPrediction) -> Result<FloodPrediction, FloodError>;

    fn get(&mut self, id: i64) -> Result<Option<FloodPrediction>, FloodError>;

    /// Most recent prediction for `location_id` made at or after
    /// `created_since` whose forecast window is still open at `now`.
    fn find_active(
        &mut self,
        location_id: &str,
        created_since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<FloodPrediction>, FloodError>;

    /// Sets the validation status (and, when given, outcome and notes) of
    /// prediction `id`. Returns `None` if no such prediction exists.
    fn set_validation(
        &mut self,
        id: i64,
        status: ValidationStatus,
        actual_outcome: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Option<FloodPrediction>, FloodError>;

    /// Non-pending predictions of `model_version` made at or after `since`.
    fn evaluated_since(
        &mut self,
        model_version: &str,
        since: DateTime<Utc>,
        location_id: Option<&str>,
    ) -> Result<Vec<FloodPrediction>, FloodError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    predictions: Vec<FloodPrediction>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            predictions: Vec::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

impl PredictionStore for MemoryStore {
    fn insert(&mut self, mut prediction: FloodPrediction) -> Result<FloodPrediction, FloodError> {
        // Default-constructed stores start at 0; ids are 1-based like SERIAL.
        self.next_id = self.next_id.max(1);
        prediction.id = Some(self.next_id);
        self.next_id += 1;
        self.predictions.push(prediction.clone());
        Ok(prediction)
    }

    fn get(&mut self, id: i64) -> Result<Option<FloodPrediction>, FloodError> {
        Ok(self.predictions.iter().find(|p| p.id == Some(id)).cloned())
    }

    fn find_active(
        &mut self,
        location_id: &str,
        created_since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<FloodPrediction>, FloodError> {
        Ok(self
            .predictions
            .iter()
            .filter(|p| {
                p.location_id == location_id
                    && p.prediction_time >= created_since
                    && p.forecast_end > now
            })
            .max_by_key(|p| (p.prediction_time, p.id))
            .cloned())
    }

    fn set_validation(
        &mut self,
        id: i64,
        status: ValidationStatus,
        actual_outcome: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Option<FloodPrediction>, FloodError> {
        let Some(p) = self.predictions.iter_mut().find(|p| p.id == Some(id)) else {
            return Ok(None);
        };
        p.validation_status = status;
        if let Some(outcome) = actual_outcome {
            p.actual_outcome = Some(outcome.to_string());
        }
        if let Some(notes) = notes {
            p.validation_notes = Some(notes.to_string());
        }
        Ok(Some(p.clone()))
    }

    fn evaluated_since(
        &mut self,
        model_version: &str,
        since: DateTime<Utc>,
        location_id: Option<&str>,
    ) -> Result<Vec<FloodPrediction>, FloodError> {
        Ok(self
            .predictions
            .iter()
            .filter(|p| {
                p.model_version == model_version
                    && p.prediction_time >= since
                    && p.validation_status != ValidationStatus::Pending
                    && location_id.is_none_or(|loc| p.location_id == loc)
            })
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// PostgreSQL store
// ---------------------------------------------------------------------------

const SELECT_COLUMNS: &str = "
    id, location_id, prediction_time, forecast_start, forecast_end,
    flood_probability, risk_level, predicted_water_level_m, predicted_rainfall_mm,
    affected_area_km2, population_at_risk, confidence_score, model_version,
    input_features, alert_level, validation_status, actual_outcome, validation_notes
";

pub struct PgPredictionStore {
    client: Client,
}

impl PgPredictionStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects using `DATABASE_URL`, loading `.env` first if present.
    pub fn connect_from_env() -> Result<Self, FloodError> {
        dotenv::dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| FloodError::Config("DATABASE_URL must be set".to_string()))?;
        let client = Client::connect(&database_url, NoTls)?;
        Ok(Self::new(client))
    }

    pub fn client(&mut self) -> &mut Client {
        &mut self.client
    }
}

fn prediction_from_row(row: &Row) -> Result<FloodPrediction, FloodError> {
    let population: i64 = row.try_get("population_at_risk")?;
    let alert_level: Option<String> = row.try_get("alert_level")?;
    let risk_level: String = row.try_get("risk_level")?;
    let validation_status: String = row.try_get("validation_status")?;

    Ok(FloodPrediction {
        id: Some(row.try_get("id")?),
        location_id: row.try_get("location_id")?,
        prediction_time: row.try_get("prediction_time")?,
        forecast_start: row.try_get("forecast_start")?,
        forecast_end: row.try_get("forecast_end")?,
        flood_probability: row.try_get("flood_probability")?,
        risk_level: risk_level.parse()?,
        predicted_water_level_m: row.try_get("predicted_water_level_m")?,
        predicted_rainfall_mm: row.try_get("predicted_rainfall_mm")?,
        affected_area_km2: row.try_get("affected_area_km2")?,
        population_at_risk: u32::try_from(population).map_err(|_| {
            FloodError::Storage(format!("population_at_risk out of range: {}", population))
        })?,
        confidence_score: row.try_get("confidence_score")?,
        model_version: row.try_get("model_version")?,
        input_features: row.try_get("input_features")?,
        alert_level: alert_level.map(|a| a.parse()).transpose()?,
        validation_status: validation_status.parse()?,
        actual_outcome: row.try_get("actual_outcome")?,
        validation_notes: row.try_get("validation_notes")?,
    })
}

impl PredictionStore for PgPredictionStore {
    fn insert(&mut self, prediction: FloodPrediction) -> Result<FloodPrediction, FloodError> {
        let row = self.client.query_one(
            "INSERT INTO flood_predictions
                (location_id, prediction_time, forecast_start, forecast_end,
                 flood_probability, risk_level, predicted_water_level_m,
                 predicted_rainfall_mm, affected_area_km2, population_at_risk,
                 confidence_score, model_version, input_features, alert_level,
                 validation_status, actual_outcome, validation_notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
             RETURNING id",
            &[
                &prediction.location_id,
                &prediction.prediction_time,
                &prediction.forecast_start,
                &prediction.forecast_end,
                &prediction.flood_probability,
                &prediction.risk_level.as_str(),
                &prediction.predicted_water_level_m,
                &prediction.predicted_rainfall_mm,
                &prediction.affected_area_km2,
                &i64::from(prediction.population_at_risk),
                &prediction.confidence_score,
                &prediction.model_version,
                &prediction.input_features,
                &prediction.alert_level.map(|a| a.as_str()),
                &prediction.validation_status.as_str(),
                &prediction.actual_outcome,
                &prediction.validation_notes,
            ],
        )?;

        Ok(FloodPrediction {
            id: Some(row.try_get(0)?),
            ..prediction
        })
    }

    fn get(&mut self, id: i64) -> Result<Option<FloodPrediction>, FloodError> {
        let query = format!("SELECT {} FROM flood_predictions WHERE id = $1", SELECT_COLUMNS);
        self.client
            .query_opt(&query, &[&id])?
            .as_ref()
            .map(prediction_from_row)
            .transpose()
    }

    fn find_active(
        &mut self,
        location_id: &str,
        created_since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<FloodPrediction>, FloodError> {
        let query = format!(
            "SELECT {} FROM flood_predictions
             WHERE location_id = $1
               AND prediction_time >= $2
               AND forecast_end > $3
             ORDER BY prediction_time DESC, id DESC
             LIMIT 1",
            SELECT_COLUMNS
        );
        self.client
            .query_opt(&query, &[&location_id, &created_since, &now])?
            .as_ref()
            .map(prediction_from_row)
            .transpose()
    }

    fn set_validation(
        &mut self,
        id: i64,
        status: ValidationStatus,
        actual_outcome: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Option<FloodPrediction>, FloodError> {
        let query = format!(
            "UPDATE flood_predictions
             SET validation_status = $2,
                 actual_outcome = COALESCE($3, actual_outcome),
                 validation_notes = COALESCE($4, validation_notes)
             WHERE id = $1
             RETURNING {}",
            SELECT_COLUMNS
        );
        self.client
            .query_opt(&query, &[&id, &status.as_str(), &actual_outcome, &notes])?
            .as_ref()
            .map(prediction_from_row)
            .transpose()
    }

    fn evaluated_since(
        &mut self,
        model_version: &str,
        since: DateTime<Utc>,
        location_id: Option<&str>,
    ) -> Result<Vec<FloodPrediction>, FloodError> {
        let query = format!(
            "SELECT {} FROM flood_predictions
             WHERE model_version = $1
               AND prediction_time >= $2
               AND validation_status <> 'pending'
               AND ($3::TEXT IS NULL OR location_id = $3)
             ORDER BY prediction_time",
            SELECT_COLUMNS
        );
        let rows = self
            .client
            .query(&query, &[&model_version, &since, &location_id])?;
        rows.iter().map(prediction_from_row).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
