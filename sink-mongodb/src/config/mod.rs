//! Configuration module for MongoDB Sink Connector
//!
//! This module handles all configuration aspects including:
//! - The static schema of recognized settings ([`schema`])
//! - Validation of raw string properties into a typed [`ValidatedConfig`]
//! - Loading properties from a TOML file with environment variable overrides

pub mod loader;
pub mod schema;

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::connection::AuthMechanism;
use crate::error::{SinkError, SinkResult};
use crate::id_strategy::IdStrategyMode;
use crate::projection::ProjectionMode;

pub use loader::{load_properties, properties_from_file, properties_from_toml};
pub use schema::{describe, schema, Importance, Password, Setting, SettingType, SettingValue, Validator};

/// Retry parameters handed to the write path; this crate never retries itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub defer_timeout: Duration,
}

/// Every recognized setting, coerced and validated
///
/// Built only through [`validate`]; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    host: String,
    port: u16,
    auth_active: bool,
    auth_mechanism: AuthMechanism,
    auth_db: String,
    username: String,
    password: Password,
    database: String,
    collection: String,
    write_concern: String,
    max_retries: u32,
    retry_defer_timeout_ms: u64,
    value_projection_type: ProjectionMode,
    value_projection_list: String,
    key_projection_type: ProjectionMode,
    key_projection_list: String,
    id_strategy: IdStrategyMode,
    field_renamer_mapping: String,
    field_renamer_regexp: String,
    post_processor_chain: String,
}

/// Validate raw properties against the schema
///
/// Missing keys take their defaults. Unrecognized keys are logged and ignored.
pub fn validate(raw: &HashMap<String, String>) -> SinkResult<ValidatedConfig> {
    let mut ignored: Vec<&str> = raw
        .keys()
        .map(String::as_str)
        .filter(|key| schema::setting(key).is_none())
        .collect();
    ignored.sort_unstable();
    for key in ignored {
        warn!("Ignoring unrecognized setting '{}'", key);
    }

    let props = Resolver { raw };
    let config = ValidatedConfig {
        host: props.string(schema::HOST)?,
        port: props.int(schema::PORT)?,
        auth_active: props.boolean(schema::AUTH_ACTIVE)?,
        auth_mechanism: props.enumerated(schema::AUTH_MODE)?,
        auth_db: props.string(schema::AUTH_DB)?,
        username: props.string(schema::USERNAME)?,
        password: props.password(schema::PASSWORD)?,
        database: props.string(schema::DATABASE)?,
        collection: props.string(schema::COLLECTION)?,
        write_concern: props.string(schema::WRITE_CONCERN)?,
        max_retries: props.int(schema::MAX_NUM_RETRIES)?,
        retry_defer_timeout_ms: props.int(schema::RETRIES_DEFER_TIMEOUT)?,
        value_projection_type: props.projection(schema::VALUE_PROJECTION_TYPE)?,
        value_projection_list: props.string(schema::VALUE_PROJECTION_LIST)?,
        key_projection_type: props.projection(schema::KEY_PROJECTION_TYPE)?,
        key_projection_list: props.string(schema::KEY_PROJECTION_LIST)?,
        id_strategy: props.enumerated(schema::DOCUMENT_ID_STRATEGY)?,
        field_renamer_mapping: props.string(schema::FIELD_RENAMER_MAPPING)?,
        field_renamer_regexp: props.string(schema::FIELD_RENAMER_REGEXP)?,
        post_processor_chain: props.string(schema::POST_PROCESSOR_CHAIN)?,
    };

    debug!(
        "Validated {} settings ({} supplied)",
        schema::schema().len(),
        raw.len()
    );
    Ok(config)
}

/// Typed view over raw properties, resolving each key through its schema entry
struct Resolver<'a> {
    raw: &'a HashMap<String, String>,
}

impl Resolver<'_> {
    fn resolve(&self, key: &str) -> SinkResult<SettingValue> {
        let setting = schema::setting(key).ok_or_else(|| {
            SinkError::invalid_config(key, "", "setting is not declared in the schema")
        })?;
        setting.resolve(self.raw.get(key).map(String::as_str))
    }

    fn string(&self, key: &str) -> SinkResult<String> {
        match self.resolve(key)? {
            SettingValue::Str(s) => Ok(s),
            other => Err(type_mismatch(key, &other)),
        }
    }

    fn password(&self, key: &str) -> SinkResult<Password> {
        match self.resolve(key)? {
            SettingValue::Password(p) => Ok(p),
            other => Err(type_mismatch(key, &other)),
        }
    }

    fn boolean(&self, key: &str) -> SinkResult<bool> {
        match self.resolve(key)? {
            SettingValue::Bool(b) => Ok(b),
            other => Err(type_mismatch(key, &other)),
        }
    }

    fn int<T: TryFrom<i64>>(&self, key: &str) -> SinkResult<T> {
        match self.resolve(key)? {
            SettingValue::Int(n) => T::try_from(n)
                .map_err(|_| SinkError::invalid_config(key, n.to_string(), "value out of range")),
            other => Err(type_mismatch(key, &other)),
        }
    }

    fn projection(&self, key: &'static str) -> SinkResult<ProjectionMode> {
        ProjectionMode::parse_setting(key, &self.string(key)?)
    }

    fn enumerated<T>(&self, key: &str) -> SinkResult<T>
    where
        T: std::str::FromStr<Err = SinkError>,
    {
        let canonical = self.string(key)?;
        canonical.parse::<T>()
    }
}

fn type_mismatch(key: &str, found: &SettingValue) -> SinkError {
    let value = match found {
        SettingValue::Password(_) => "[hidden]".to_string(),
        other => format!("{:?}", other),
    };
    SinkError::invalid_config(key, value, "value does not match the declared type")
}

impl ValidatedConfig {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn auth_active(&self) -> bool {
        self.auth_active
    }

    pub fn auth_mechanism(&self) -> AuthMechanism {
        self.auth_mechanism
    }

    pub fn auth_db(&self) -> &str {
        &self.auth_db
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &Password {
        &self.password
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Write concern, passed through to the store unchecked
    pub fn write_concern(&self) -> &str {
        &self.write_concern
    }

    pub fn retry_settings(&self) -> RetrySettings {
        RetrySettings {
            max_retries: self.max_retries,
            defer_timeout: Duration::from_millis(self.retry_defer_timeout_ms),
        }
    }

    pub fn value_projection_type(&self) -> ProjectionMode {
        self.value_projection_type
    }

    pub fn value_projection_list(&self) -> &str {
        &self.value_projection_list
    }

    pub fn key_projection_type(&self) -> ProjectionMode {
        self.key_projection_type
    }

    pub fn key_projection_list(&self) -> &str {
        &self.key_projection_list
    }

    pub fn id_strategy(&self) -> IdStrategyMode {
        self.id_strategy
    }

    pub fn field_renamer_mapping(&self) -> &str {
        &self.field_renamer_mapping
    }

    pub fn field_renamer_regexp(&self) -> &str {
        &self.field_renamer_regexp
    }

    pub fn post_processor_chain(&self) -> &str {
        &self.post_processor_chain
    }

    /// Canonical string form of every setting
    ///
    /// Feeding the result back into [`validate`] yields an equal config.
    /// The map contains the clear-text password.
    pub fn to_properties(&self) -> HashMap<String, String> {
        let pairs = [
            (schema::HOST, self.host.clone()),
            (schema::PORT, self.port.to_string()),
            (schema::AUTH_ACTIVE, self.auth_active.to_string()),
            (schema::AUTH_MODE, self.auth_mechanism.as_str().to_string()),
            (schema::AUTH_DB, self.auth_db.clone()),
            (schema::USERNAME, self.username.clone()),
            (schema::PASSWORD, self.password.value().to_string()),
            (schema::DATABASE, self.database.clone()),
            (schema::COLLECTION, self.collection.clone()),
            (schema::WRITE_CONCERN, self.write_concern.clone()),
            (schema::MAX_NUM_RETRIES, self.max_retries.to_string()),
            (
                schema::RETRIES_DEFER_TIMEOUT,
                self.retry_defer_timeout_ms.to_string(),
            ),
            (
                schema::VALUE_PROJECTION_TYPE,
                self.value_projection_type.as_str().to_string(),
            ),
            (schema::VALUE_PROJECTION_LIST, self.value_projection_list.clone()),
            (
                schema::KEY_PROJECTION_TYPE,
                self.key_projection_type.as_str().to_string(),
            ),
            (schema::KEY_PROJECTION_LIST, self.key_projection_list.clone()),
            (schema::DOCUMENT_ID_STRATEGY, self.id_strategy.as_str().to_string()),
            (schema::FIELD_RENAMER_MAPPING, self.field_renamer_mapping.clone()),
            (schema::FIELD_RENAMER_REGEXP, self.field_renamer_regexp.clone()),
            (schema::POST_PROCESSOR_CHAIN, self.post_processor_chain.clone()),
        ];

        pairs
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }
}
