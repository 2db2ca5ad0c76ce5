/// Barangay registry for the flood monitoring service.
///
/// Defines the locations the service forecasts for, along with the static
/// attributes the prediction generator uses: land area, population and the
/// local government's flood hazard classification. Profiles are loaded from
/// the `[[barangays]]` tables of the service configuration; all other
/// modules should look locations up here rather than hardcoding attributes.

use serde::{Deserialize, Serialize};

use crate::model::BarangayRiskClass;

// ---------------------------------------------------------------------------
// Barangay metadata
// ---------------------------------------------------------------------------

/// Static attributes of one barangay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarangayProfile {
    /// Stable identifier used as `location_id` on readings and predictions.
    pub id: String,
    pub name: String,
    /// WGS84 latitude.
    #[serde(default)]
    pub latitude: f64,
    /// WGS84 longitude.
    #[serde(default)]
    pub longitude: f64,
    /// Land area; the generator falls back to its default when absent.
    #[serde(default)]
    pub area_km2: Option<f64>,
    #[serde(default)]
    pub population: Option<u32>,
    /// Hazard class as recorded, e.g. "very_high". Kept as text so that an
    /// unrecognized value degrades to the default base probability instead
    /// of rejecting the whole registry.
    #[serde(default)]
    pub risk_class: String,
}

impl BarangayProfile {
    /// Parsed hazard class, or `None` if missing or unrecognized.
    pub fn risk_class(&self) -> Option<BarangayRiskClass> {
        self.risk_class.parse().ok()
    }
}

/// Looks up a barangay by id. Returns `None` if not found.
pub fn find_barangay<'a>(registry: &'a [BarangayProfile], id: &str) -> Option<&'a BarangayProfile> {
    registry.iter().find(|b| b.id == id)
}

/// Ids that appear more than once in the registry.
pub fn duplicate_ids(registry: &[BarangayProfile]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    registry
        .iter()
        .filter(|b| !seen.insert(b.id.as_str()))
        .map(|b| b.id.as_str())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
