//! Service configuration.
//!
//! Loaded from a TOML file. Every section is optional and falls back to the
//! built-in defaults, so an empty file yields the stock thresholds:
//!
//! ```toml
//! [logging]
//! level = "info"
//! file = "/var/log/floodwatch.log"
//! timestamps = true
//!
//! [scoring]
//! extreme_at = 6
//!
//! [prediction]
//! model_version = "rule-based-v1.0"
//! freshness_minutes = 120
//!
//! [[barangays]]
//! id = "BRGY-001"
//! name = "Barangay Tumana"
//! risk_class = "very_high"
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::alert::thresholds::ScoringConfig;
use crate::barangays::{duplicate_ids, BarangayProfile};
use crate::logging::{self, Component, LogLevel};
use crate::model::FloodError;
use crate::prediction::generator::PredictionConfig;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            timestamps: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub logging: LoggingConfig,
    pub scoring: ScoringConfig,
    pub prediction: PredictionConfig,
    pub barangays: Vec<BarangayProfile>,
}

impl ServiceConfig {
    /// Parses and validates configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, FloodError> {
        let config: ServiceConfig =
            toml::from_str(text).map_err(|e| FloodError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FloodError> {
        self.scoring.validate()?;
        self.prediction.validate()?;
        if let Some(dup) = duplicate_ids(&self.barangays).first() {
            return Err(FloodError::Config(format!("duplicate barangay id '{}'", dup)));
        }
        if let Some(b) = self
            .barangays
            .iter()
            .find(|b| b.area_km2.is_some_and(|a| !a.is_finite() || a < 0.0))
        {
            return Err(FloodError::Config(format!(
                "barangay '{}' area_km2 must be finite and non-negative",
                b.id
            )));
        }
        Ok(())
    }

    /// Installs the global logger described by `[logging]`.
    pub fn init_logging(&self) {
        logging::init_logger(
            self.logging.level,
            self.logging.file.as_deref(),
            self.logging.timestamps,
        );
    }
}

/// Reads and validates the configuration file at `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<ServiceConfig, FloodError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| FloodError::Config(format!("{}: {}", path.display(), e)))?;
    let config = ServiceConfig::from_toml_str(&text)?;
    logging::info(
        Component::Config,
        None,
        &format!(
            "loaded {} ({} barangays)",
            path.display(),
            config.barangays.len()
        ),
    );
    Ok(config)
}
