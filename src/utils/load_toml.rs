use crate::errors::{CoordinationError, Result};
use serde::de::DeserializeOwned;
use std::fs;

pub fn load_toml<T: DeserializeOwned + 'static>(path: &str) -> Result<T> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| CoordinationError::Config(format!("invalid TOML in file '{}': {}", path, e)))
}
