//! Enum <-> `TEXT` column conversions. Every status/intent/grounding enum
//! already carries the right `SCREAMING_SNAKE_CASE` serde representation
//! (`leadguard_core::types`), so storage just routes through `serde_json`
//! rather than hand-rolling a second string mapping.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

pub fn to_db_str<T: Serialize>(value: &T) -> Result<String, StorageError> {
    let json = serde_json::to_value(value)?;
    Ok(json.as_str().map(str::to_string).unwrap_or_default())
}

pub fn from_db_str<T: DeserializeOwned>(value: &str) -> Result<T, StorageError> {
    Ok(serde_json::from_value(serde_json::Value::String(
        value.to_string(),
    ))?)
}
