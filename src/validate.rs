use crate::types::holiday::{HolidayOffsetConfig, REQUIRED_FIELDS};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid request: configArray must be an array")]
    NotAnArray,
    #[error("Invalid config: entry {index} must be an object")]
    NotAnObject { index: usize },
    #[error("Invalid config: missing field '{field}' in entry {index}")]
    MissingField { index: usize, field: &'static str },
}

/// Checks a submitted configuration array. Either every entry passes or nothing
/// is returned.
pub fn validate_config_array(value: &Value) -> Result<Vec<HolidayOffsetConfig>, ValidationError> {
    let items = value.as_array().ok_or(ValidationError::NotAnArray)?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| validate_entry(index, item))
        .collect()
}

// Presence only; value types are passed through unchecked.
pub fn validate_entry(index: usize, value: &Value) -> Result<HolidayOffsetConfig, ValidationError> {
    let fields = value
        .as_object()
        .ok_or(ValidationError::NotAnObject { index })?;
    if let Some(field) = REQUIRED_FIELDS
        .into_iter()
        .find(|field| !fields.contains_key(*field))
    {
        return Err(ValidationError::MissingField { index, field });
    }
    Ok(HolidayOffsetConfig::from_fields(fields.clone()))
}
