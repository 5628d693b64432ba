use std::any::type_name;

use cooltab_core::errors::{ErrorInfo, GridError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

fn serde_error<T: ?Sized>(code: &str, err: impl ToString) -> GridError {
    GridError::Serde(ErrorInfo::new(code, err.to_string()).with_context("type", type_name::<T>()))
}

/// Serializes a value into pretty JSON with object keys in sorted order.
///
/// Going through [`Value`] sorts keys (its map is ordered by key) while
/// arrays keep their order, so warning records and point lists stay in
/// report order. Output ends with a newline.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, GridError> {
    let tree: Value =
        serde_json::to_value(value).map_err(|err| serde_error::<T>("json_serialize", err))?;
    let mut bytes =
        serde_json::to_vec_pretty(&tree).map_err(|err| serde_error::<T>("json_write", err))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Deserializes a value from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, GridError> {
    serde_json::from_slice(data).map_err(|err| serde_error::<T>("json_deserialize", err))
}

/// Deserializes a YAML document such as a [`crate::config::GridConfig`].
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, GridError> {
    serde_yaml::from_slice(data).map_err(|err| serde_error::<T>("yaml_deserialize", err))
}
