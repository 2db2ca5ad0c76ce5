//! Flood risk scoring and forecasting core for barangay-level flood
//! monitoring.
//!
//! - `analysis`: windowed aggregation of environmental readings.
//! - `alert`: characteristics risk scoring and prediction freshness.
//! - `prediction`: forecast generation, operator validation, accuracy.
//! - `store`: prediction persistence (in-memory and PostgreSQL).
//! - `barangays`: static location registry.
//! - `config`, `logging`, `model`: shared plumbing and types.

pub mod alert;
pub mod analysis;
pub mod barangays;
pub mod config;
pub mod logging;
pub mod model;
pub mod prediction;
pub mod store;

pub use alert::thresholds::{score_flood_risk, RiskAssessment, ScoringConfig};
pub use analysis::aggregation::{aggregate, AggregatedWindow, PredictionInputs, TimeWindow};
pub use config::{load_config, ServiceConfig};
pub use model::FloodError;
pub use prediction::generator::{GenerationOutcome, PredictionGenerator, PredictionRequest};
pub use prediction::service::PredictionService;
pub use prediction::validation::{compute_accuracy, validate_prediction, AccuracyReport};
pub use store::{MemoryStore, PgPredictionStore, PredictionStore};
