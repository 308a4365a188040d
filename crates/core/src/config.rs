//! Config file loading.
//!
//! Files ending in `.json` are parsed as JSON, everything else as TOML.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::result::Result;

/// Load a config value of type `T` from `path`.
///
/// # Errors
///
/// Returns [`Error::FileReadFailed`] if the file cannot be read and a
/// parse error if its contents do not match `T`.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::file_read_failed(path, e.to_string()))?;

    if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&content).map_err(|e| Error::json_parse_failed(path, e.to_string()))
    } else {
        toml::from_str(&content).map_err(|e| Error::toml_parse_failed(path, e.to_string()))
    }
}

/// Render a config value as pretty TOML.
///
/// # Errors
///
/// Returns [`Error::TomlSerializeFailed`] if `value` has no TOML form.
pub fn to_toml<T: Serialize>(value: &T) -> Result<String> {
    toml::to_string_pretty(value).map_err(|e| Error::TomlSerializeFailed {
        reason: e.to_string(),
    })
}

/// Read an environment variable and parse it, if set.
///
/// # Errors
///
/// Returns [`Error::InvalidValue`] if the variable is set but does not parse.
pub fn env_override<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| Error::invalid_value(key, e.to_string())),
        Err(_) => Ok(None),
    }
}
