/// Structured logging for the flood monitoring service
///
/// Provides context-rich logging tagged with the emitting component and,
/// where relevant, the barangay/location identifier. Supports console output
/// and file-based logging for long-running deployments.

use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use crate::prediction::validation::AccuracyReport;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Aggregator,
    Scorer,
    Predictor,
    Validator,
    Store,
    Config,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Aggregator => write!(f, "AGG"),
            Component::Scorer => write!(f, "RISK"),
            Component::Predictor => write!(f, "PRED"),
            Component::Validator => write!(f, "VALID"),
            Component::Store => write!(f, "DB"),
            Component::Config => write!(f, "CFG"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        // A poisoned lock only means another thread panicked mid-log.
        let mut slot = LOGGER.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(logger);
    }

    fn log(&self, level: LogLevel, component: Component, location_id: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let location_part = location_id.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!(
            "{} {} {}{}: {}",
            timestamp, level, component, location_part, message
        );

        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", component, location_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", component, location_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, component: Component, location_id: Option<&str>, message: &str) {
    // Logging must never take the service down, so a poisoned lock is skipped.
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, component, location_id, message);
        }
    }
}

/// Log a general informational message
pub fn info(component: Component, location_id: Option<&str>, message: &str) {
    emit(LogLevel::Info, component, location_id, message);
}

/// Log a warning message
pub fn warn(component: Component, location_id: Option<&str>, message: &str) {
    emit(LogLevel::Warning, component, location_id, message);
}

/// Log an error message
pub fn error(component: Component, location_id: Option<&str>, message: &str) {
    emit(LogLevel::Error, component, location_id, message);
}

/// Log a debug message
pub fn debug(component: Component, location_id: Option<&str>, message: &str) {
    emit(LogLevel::Debug, component, location_id, message);
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a storage failure. Storage errors are always reported at error level;
/// the caller still receives the original error.
pub fn log_store_failure(location_id: Option<&str>, operation: &str, err: &dyn std::error::Error) {
    let message = format!("{} failed: {}", operation, err);
    error(Component::Store, location_id, &message);
}

// ---------------------------------------------------------------------------
// Accuracy Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of an accuracy evaluation run.
///
/// Level reflects how much feedback was available: nothing evaluated is a
/// warning, since the metrics are then all zero by definition.
pub fn log_accuracy_summary(model_version: &str, report: &AccuracyReport) {
    let message = format_accuracy_summary(model_version, report);
    if report.total_evaluated == 0 {
        warn(Component::Validator, None, &message);
    } else {
        info(Component::Validator, None, &message);
    }
}

fn format_accuracy_summary(model_version: &str, report: &AccuracyReport) -> String {
    format!(
        "Accuracy for {} over {} days: {} evaluated, accuracy {:.3}, precision {:.3}, recall {:.3}, avg confidence {:.3}",
        model_version,
        report.evaluation_days,
        report.total_evaluated,
        report.accuracy,
        report.precision,
        report.recall,
        report.average_confidence
    )
}
