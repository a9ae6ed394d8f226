//! Loading raw properties from a TOML file
//!
//! Nested tables flatten into dotted keys, so `[mongodb] host = "db"` and
//! `mongodb.host = "db"` are equivalent. Scalars are rendered as strings and
//! validated later by [`super::validate`].

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use tracing::info;

use super::schema;
use crate::error::{SinkError, SinkResult};

/// Environment variables that override deployment-specific settings and secrets
const ENV_OVERRIDES: [(&str, &str); 4] = [
    ("MONGODB_HOST", schema::HOST),
    ("MONGODB_PORT", schema::PORT),
    ("MONGODB_USERNAME", schema::USERNAME),
    ("MONGODB_PASSWORD", schema::PASSWORD),
];

/// Load properties from the file named by `CONNECTOR_CONFIG_PATH`, then apply
/// environment overrides
pub fn load_properties() -> SinkResult<HashMap<String, String>> {
    let config_path = env::var("CONNECTOR_CONFIG_PATH").map_err(|_| {
        SinkError::SettingsFile(
            "CONNECTOR_CONFIG_PATH environment variable must be set to the path of the TOML configuration file"
                .to_string(),
        )
    })?;

    let mut properties = properties_from_file(&config_path)?;
    apply_overrides(&mut properties, |name| env::var(name).ok());
    Ok(properties)
}

/// Read and flatten a TOML settings file
pub fn properties_from_file(path: impl AsRef<Path>) -> SinkResult<HashMap<String, String>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        SinkError::SettingsFile(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    properties_from_toml(&contents)
}

/// Flatten TOML text into dotted string properties
pub fn properties_from_toml(contents: &str) -> SinkResult<HashMap<String, String>> {
    let table: toml::Table = toml::from_str(contents)
        .map_err(|e| SinkError::SettingsFile(format!("Failed to parse TOML config: {}", e)))?;

    let mut properties = HashMap::new();
    flatten("", &table, &mut properties)?;
    Ok(properties)
}

fn flatten(
    prefix: &str,
    table: &toml::Table,
    out: &mut HashMap<String, String>,
) -> SinkResult<()> {
    for (name, value) in table {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };

        let rendered = match value {
            toml::Value::Table(nested) => {
                flatten(&key, nested, out)?;
                continue;
            }
            toml::Value::String(s) => s.clone(),
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            toml::Value::Array(_) | toml::Value::Datetime(_) => {
                return Err(SinkError::SettingsFile(format!(
                    "'{}' must be a string, number or boolean",
                    key
                )));
            }
        };
        out.insert(key, rendered);
    }
    Ok(())
}

fn apply_overrides<F>(properties: &mut HashMap<String, String>, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (variable, key) in ENV_OVERRIDES {
        if let Some(value) = lookup(variable) {
            info!("Overriding {} from environment", key);
            properties.insert(key.to_string(), value);
        }
    }
}
