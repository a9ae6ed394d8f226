//! Declarative schema of every setting the sink recognizes
//!
//! Each [`Setting`] pairs a stable key with its type, default, importance,
//! validator and documentation. The table is static; validation walks it and
//! never consults anything else.

use std::fmt;

use crate::connection::AuthMechanism;
use crate::error::{SinkError, SinkResult};
use crate::id_strategy::IdStrategyMode;
use crate::processor::DOCUMENT_ID_ADDER;
use crate::projection::ProjectionMode;

pub const HOST: &str = "mongodb.host";
pub const PORT: &str = "mongodb.port";
pub const AUTH_ACTIVE: &str = "mongodb.auth.active";
pub const AUTH_MODE: &str = "mongodb.auth.mode";
pub const AUTH_DB: &str = "mongodb.auth.db";
pub const USERNAME: &str = "mongodb.username";
pub const PASSWORD: &str = "mongodb.password";
pub const DATABASE: &str = "mongodb.database";
pub const COLLECTION: &str = "mongodb.collection";
pub const WRITE_CONCERN: &str = "mongodb.writeconcern";
pub const MAX_NUM_RETRIES: &str = "mongodb.max.num.retries";
pub const RETRIES_DEFER_TIMEOUT: &str = "mongodb.retries.defer.timeout";
pub const VALUE_PROJECTION_TYPE: &str = "mongodb.value.projection.type";
pub const VALUE_PROJECTION_LIST: &str = "mongodb.value.projection.list";
pub const KEY_PROJECTION_TYPE: &str = "mongodb.key.projection.type";
pub const KEY_PROJECTION_LIST: &str = "mongodb.key.projection.list";
pub const DOCUMENT_ID_STRATEGY: &str = "mongodb.document.id.strategy";
pub const FIELD_RENAMER_MAPPING: &str = "mongodb.field.renamer.mapping";
pub const FIELD_RENAMER_REGEXP: &str = "mongodb.field.renamer.regexp";
pub const POST_PROCESSOR_CHAIN: &str = "mongodb.post.processor.chain";

/// Declared type of a setting's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingType {
    String,
    Int,
    Boolean,
    /// A string that must never be printed
    Password,
}

/// How prominently a setting is documented
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Importance {
    High,
    Medium,
    Low,
}

/// Constraint applied after type coercion
#[derive(Debug, Clone, Copy)]
pub enum Validator {
    /// Any value of the declared type
    Any,
    /// Inclusive integer range
    Range { min: i64, max: i64 },
    /// Case-insensitive enumerator; normalized to the listed canonical spelling
    OneOf(&'static [&'static str]),
}

/// A single recognized setting
#[derive(Debug, Clone, Copy)]
pub struct Setting {
    pub key: &'static str,
    pub ty: SettingType,
    pub default: &'static str,
    pub importance: Importance,
    pub validator: Validator,
    pub doc: &'static str,
}

/// A setting value after coercion and validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Password(Password),
}

/// Secret string; `Debug` and `Display` never reveal it
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The clear-text secret
    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[hidden]")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[hidden]")
    }
}

const INT_MAX: i64 = i32::MAX as i64;

static SETTINGS: [Setting; 20] = [
    Setting {
        key: HOST,
        ty: SettingType::String,
        default: "localhost",
        importance: Importance::High,
        validator: Validator::Any,
        doc: "single mongod host to connect with",
    },
    Setting {
        key: PORT,
        ty: SettingType::Int,
        default: "27017",
        importance: Importance::High,
        validator: Validator::Range { min: 0, max: 65535 },
        doc: "port mongod is listening on",
    },
    Setting {
        key: AUTH_ACTIVE,
        ty: SettingType::Boolean,
        default: "false",
        importance: Importance::Medium,
        validator: Validator::Any,
        doc: "whether or not the connection needs authentication",
    },
    Setting {
        key: AUTH_MODE,
        ty: SettingType::String,
        default: "SCRAM-SHA-1",
        importance: Importance::Medium,
        validator: Validator::OneOf(AuthMechanism::NAMES),
        doc: "which authentication mechanism is used",
    },
    Setting {
        key: AUTH_DB,
        ty: SettingType::String,
        default: "admin",
        importance: Importance::Medium,
        validator: Validator::Any,
        doc: "authentication database to use",
    },
    Setting {
        key: USERNAME,
        ty: SettingType::String,
        default: "",
        importance: Importance::Medium,
        validator: Validator::Any,
        doc: "username for authentication",
    },
    Setting {
        key: PASSWORD,
        ty: SettingType::Password,
        default: "",
        importance: Importance::Medium,
        validator: Validator::Any,
        doc: "password for authentication",
    },
    Setting {
        key: DATABASE,
        ty: SettingType::String,
        default: "kafkaconnect",
        importance: Importance::High,
        validator: Validator::Any,
        doc: "sink database name to write to",
    },
    Setting {
        key: COLLECTION,
        ty: SettingType::String,
        default: "kafkatopic",
        importance: Importance::High,
        validator: Validator::Any,
        doc: "single sink collection name to write to",
    },
    Setting {
        key: WRITE_CONCERN,
        ty: SettingType::String,
        default: "1",
        importance: Importance::High,
        validator: Validator::Any,
        doc: "write concern to apply when saving data",
    },
    Setting {
        key: MAX_NUM_RETRIES,
        ty: SettingType::Int,
        default: "1",
        importance: Importance::Medium,
        validator: Validator::Range { min: 0, max: INT_MAX },
        doc: "how often a retry should be done on write errors",
    },
    Setting {
        key: RETRIES_DEFER_TIMEOUT,
        ty: SettingType::Int,
        default: "10000",
        importance: Importance::Medium,
        validator: Validator::Range { min: 0, max: INT_MAX },
        doc: "how long in ms a retry should get deferred",
    },
    Setting {
        key: VALUE_PROJECTION_TYPE,
        ty: SettingType::String,
        default: "none",
        importance: Importance::Low,
        validator: Validator::OneOf(ProjectionMode::NAMES),
        doc: "whether or not and which value projection to use",
    },
    Setting {
        key: VALUE_PROJECTION_LIST,
        ty: SettingType::String,
        default: "",
        importance: Importance::Low,
        validator: Validator::Any,
        doc: "comma separated list of field names for value projection",
    },
    Setting {
        key: KEY_PROJECTION_TYPE,
        ty: SettingType::String,
        default: "none",
        importance: Importance::Low,
        validator: Validator::OneOf(ProjectionMode::NAMES),
        doc: "whether or not and which key projection to use",
    },
    Setting {
        key: KEY_PROJECTION_LIST,
        ty: SettingType::String,
        default: "",
        importance: Importance::Low,
        validator: Validator::Any,
        doc: "comma separated list of field names for key projection",
    },
    Setting {
        key: DOCUMENT_ID_STRATEGY,
        ty: SettingType::String,
        default: "objectid",
        importance: Importance::High,
        validator: Validator::OneOf(IdStrategyMode::NAMES),
        doc: "which strategy to use for a unique document id (_id)",
    },
    Setting {
        key: FIELD_RENAMER_MAPPING,
        ty: SettingType::String,
        default: "[]",
        importance: Importance::Low,
        validator: Validator::Any,
        doc: "inline JSON array with objects describing field name mappings",
    },
    Setting {
        key: FIELD_RENAMER_REGEXP,
        ty: SettingType::String,
        default: "[]",
        importance: Importance::Low,
        validator: Validator::Any,
        doc: "inline JSON array with objects describing regexp settings",
    },
    Setting {
        key: POST_PROCESSOR_CHAIN,
        ty: SettingType::String,
        default: DOCUMENT_ID_ADDER,
        importance: Importance::Low,
        validator: Validator::Any,
        doc: "comma separated list of post processor identifiers to build the chain with",
    },
];

/// All recognized settings, in declaration order
pub fn schema() -> &'static [Setting] {
    &SETTINGS
}

/// Look up a setting by key
pub fn setting(key: &str) -> Option<&'static Setting> {
    SETTINGS.iter().find(|s| s.key == key)
}

impl Setting {
    /// Coerce and validate a raw value, falling back to the default when absent
    pub fn resolve(&self, raw: Option<&str>) -> SinkResult<SettingValue> {
        let text = raw.unwrap_or(self.default);

        match self.ty {
            SettingType::String => Ok(SettingValue::Str(self.validator.normalize(self.key, text)?)),
            SettingType::Password => Ok(SettingValue::Password(Password::new(text))),
            SettingType::Int => {
                let number: i64 = text.trim().parse().map_err(|_| {
                    SinkError::invalid_config(self.key, text, "expected an integer value")
                })?;
                self.validator.check_range(self.key, number)?;
                Ok(SettingValue::Int(number))
            }
            SettingType::Boolean => match text.trim() {
                t if t.eq_ignore_ascii_case("true") => Ok(SettingValue::Bool(true)),
                t if t.eq_ignore_ascii_case("false") => Ok(SettingValue::Bool(false)),
                _ => Err(SinkError::invalid_config(
                    self.key,
                    text,
                    "expected a boolean value (true or false)",
                )),
            },
        }
    }
}

impl Validator {
    fn normalize(&self, key: &str, value: &str) -> SinkResult<String> {
        match self {
            Validator::OneOf(names) => names
                .iter()
                .find(|name| name.eq_ignore_ascii_case(value))
                .map(|name| name.to_string())
                .ok_or_else(|| {
                    SinkError::invalid_config(
                        key,
                        value,
                        format!("invalid enumerator, expected one of [{}]", names.join(", ")),
                    )
                }),
            Validator::Any | Validator::Range { .. } => Ok(value.to_string()),
        }
    }

    fn check_range(&self, key: &str, value: i64) -> SinkResult<()> {
        if let Validator::Range { min, max } = *self {
            if value < min {
                return Err(SinkError::invalid_config(
                    key,
                    value.to_string(),
                    format!("value must be at least {}", min),
                ));
            }
            if value > max {
                return Err(SinkError::invalid_config(
                    key,
                    value.to_string(),
                    format!("value must be no more than {}", max),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Any => Ok(()),
            Validator::Range { min, max } if *max == INT_MAX => write!(f, "[{},...]", min),
            Validator::Range { min, max } => write!(f, "[{},...,{}]", min, max),
            Validator::OneOf(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

/// Render every setting as operator-facing help text, grouped by importance
pub fn describe() -> String {
    let mut settings: Vec<&Setting> = SETTINGS.iter().collect();
    settings.sort_by_key(|s| s.importance);

    let mut out = String::new();
    for s in settings {
        out.push_str(&format!("{}\n", s.key));
        out.push_str(&format!("  {}\n", s.doc));
        out.push_str(&format!(
            "  type: {:?}, default: \"{}\", importance: {:?}",
            s.ty, s.default, s.importance
        ));
        let constraint = s.validator.to_string();
        if !constraint.is_empty() {
            out.push_str(&format!(", valid values: {}", constraint));
        }
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<&str> = schema().iter().map(|s| s.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), schema().len());
    }

    #[test]
    fn test_defaults_resolve() {
        for s in schema() {
            assert!(s.resolve(None).is_ok(), "default of {} must be valid", s.key);
        }
    }

    #[test]
    fn test_port_range_boundaries() {
        let port = setting(PORT).unwrap();
        assert_eq!(port.resolve(Some("0")).unwrap(), SettingValue::Int(0));
        assert_eq!(port.resolve(Some("65535")).unwrap(), SettingValue::Int(65535));
        assert!(matches!(
            port.resolve(Some("65536")),
            Err(SinkError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            port.resolve(Some("-1")),
            Err(SinkError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            port.resolve(Some("not-a-port")),
            Err(SinkError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_enumerator_case_folding() {
        let projection = setting(VALUE_PROJECTION_TYPE).unwrap();
        for raw in ["BLACKLIST", "blacklist", "BlackList"] {
            assert_eq!(
                projection.resolve(Some(raw)).unwrap(),
                SettingValue::Str("blacklist".to_string())
            );
        }
        assert!(projection.resolve(Some("greylist")).is_err());
    }

    #[test]
    fn test_boolean_coercion() {
        let active = setting(AUTH_ACTIVE).unwrap();
        assert_eq!(active.resolve(Some("TRUE")).unwrap(), SettingValue::Bool(true));
        assert_eq!(active.resolve(Some("false")).unwrap(), SettingValue::Bool(false));
        assert!(active.resolve(Some("yes")).is_err());
    }

    #[test]
    fn test_password_is_hidden() {
        let secret = Password::new("s3cr3t");
        assert_eq!(format!("{:?}", secret), "[hidden]");
        assert_eq!(secret.to_string(), "[hidden]");
        assert_eq!(secret.value(), "s3cr3t");
    }

    #[test]
    fn test_describe_lists_every_key() {
        let help = describe();
        for s in schema() {
            assert!(help.contains(s.key));
        }
        assert!(help.contains("[0,...,65535]"));
    }
}
