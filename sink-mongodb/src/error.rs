//! Error types for the MongoDB Sink Connector
//!
//! Every failure names the offending setting key, stage identifier or field.
//! All variants except [`SinkError::MissingProvidedId`] and
//! [`SinkError::InvalidDocument`] are raised while the pipeline is assembled
//! and mean the connector must not start.

use thiserror::Error;

/// Result type alias for sink assembly and record processing
pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Errors raised by the MongoDB sink core
#[derive(Debug, Error)]
pub enum SinkError {
    /// A setting failed type coercion, range or enumerator validation
    #[error("invalid value '{value}' for configuration {key}: {reason}")]
    InvalidConfiguration {
        key: String,
        value: String,
        reason: String,
    },

    /// Authentication is active with a mechanism other than the supported one
    #[error("authentication mechanism '{mechanism}' is not supported, only {supported} is")]
    UnsupportedAuthMechanism {
        mechanism: String,
        supported: &'static str,
    },

    /// Authentication is active but username or password is empty
    #[error("missing credentials: {key} must not be empty when authentication is active")]
    MissingCredentials { key: &'static str },

    /// A projection type outside none/blacklist/whitelist
    #[error("invalid projection type '{value}' for {key} (expected none, blacklist or whitelist)")]
    InvalidProjectionMode { key: &'static str, value: String },

    /// A field renamer setting could not be parsed or compiled
    #[error("invalid rename settings in {key}: {reason}")]
    InvalidRenameSpec {
        key: &'static str,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An identity strategy name that maps to no strategy
    #[error("unknown document id strategy '{value}' for {key}")]
    UnknownIdentityMode { key: &'static str, value: String },

    /// A partial id strategy was selected without a key projection
    #[error("id strategy '{strategy}' requires {key} to be blacklist or whitelist")]
    ProjectionRequired {
        strategy: &'static str,
        key: &'static str,
    },

    /// A post-processor stage could not be found or constructed
    #[error("post processor '{stage}' could not be instantiated: {reason}")]
    StageInstantiation {
        stage: String,
        reason: String,
        #[source]
        source: Option<Box<SinkError>>,
    },

    /// The provided id field is absent from the record at processing time
    #[error("provided id strategy expects an '_id' field in the record {side} document")]
    MissingProvidedId { side: &'static str },

    /// A record key or value is neither a document nor absent
    #[error("record {side} must be a JSON object or null, got {found}")]
    InvalidDocument { side: &'static str, found: String },

    /// The settings file could not be read or flattened
    #[error("settings file error: {0}")]
    SettingsFile(String),
}

impl SinkError {
    pub(crate) fn invalid_config(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SinkError::InvalidConfiguration {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn stage(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        SinkError::StageInstantiation {
            stage: stage.into(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Whether the error belongs to connector startup rather than to a single record
    pub fn is_startup(&self) -> bool {
        !matches!(
            self,
            SinkError::MissingProvidedId { .. } | SinkError::InvalidDocument { .. }
        )
    }
}
