use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::template::Revision;

pub const TIMESTAMP_FIELD: &str = "offset_update_timestamp";

/// Required keys of every configuration entry, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "offset_description",
    "offset_eid_al_adha",
    "offset_eid_al_fitr",
    "offset_mawlid",
    "offset_greg_year",
    "offset_ethio_year",
    "offset_hirji_year",
    "offset_stage",
];

/// One holiday-offset rule as the client applications consume it.
///
/// Entries are kept as JSON objects: presence of the required keys is checked
/// on the way in, their value types are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolidayOffsetConfig(Map<String, Value>);

impl HolidayOffsetConfig {
    pub(crate) fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn description(&self) -> Option<&str> {
        self.0.get("offset_description").and_then(Value::as_str)
    }

    pub fn stage(&self) -> Option<Stage> {
        self.0
            .get("offset_stage")
            .and_then(Value::as_str)
            .and_then(Stage::parse)
    }

    pub fn update_timestamp(&self) -> Option<i64> {
        self.0.get(TIMESTAMP_FIELD).and_then(Value::as_i64)
    }

    pub fn set_update_timestamp(&mut self, millis: i64) {
        self.0.insert(TIMESTAMP_FIELD.to_string(), Value::from(millis));
    }

    pub(crate) fn clear_update_timestamp(&mut self) {
        self.0.remove(TIMESTAMP_FIELD);
    }

    /// Compares every field except the update timestamp.
    pub fn same_content(&self, other: &Self) -> bool {
        let left = self.0.iter().filter(|(key, _)| *key != TIMESTAMP_FIELD);
        let right = other.0.iter().filter(|(key, _)| *key != TIMESTAMP_FIELD);
        left.eq(right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Dev,
    Staging,
    Prod,
}

impl Stage {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "dev" => Some(Self::Dev),
            "staging" => Some(Self::Staging),
            "prod" => Some(Self::Prod),
            _ => None,
        }
    }
}

/// The whole configuration array together with the store revision it was read at.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    pub entries: Vec<HolidayOffsetConfig>,
    pub revision: Revision,
}
