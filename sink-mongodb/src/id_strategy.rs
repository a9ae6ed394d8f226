//! Document id (`_id`) strategies
//!
//! [`select_strategy`] maps `mongodb.document.id.strategy` to one of the
//! strategies below. Partial strategies own the key-side
//! [`ProjectionPolicy`]; note that `partialvalue` also uses the *key*
//! projection settings to pick the value fields making up the id.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bson::oid::ObjectId;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::config::{schema, ValidatedConfig};
use crate::error::{SinkError, SinkResult};
use crate::projection::{ProjectionMode, ProjectionPolicy};
use crate::record::{Document, RecordCoordinates, Side, SinkDocument, ID_FIELD};

/// Configured id strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdStrategyMode {
    ObjectId,
    Uuid,
    SourceMeta,
    FullKey,
    FullValue,
    PartialKey,
    PartialValue,
    ProvidedInKey,
    ProvidedInValue,
}

impl IdStrategyMode {
    pub const NAMES: &'static [&'static str] = &[
        "objectid",
        "uuid",
        "sourcemeta",
        "fullkey",
        "fullvalue",
        "partialkey",
        "partialvalue",
        "providedinkey",
        "providedinvalue",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdStrategyMode::ObjectId => "objectid",
            IdStrategyMode::Uuid => "uuid",
            IdStrategyMode::SourceMeta => "sourcemeta",
            IdStrategyMode::FullKey => "fullkey",
            IdStrategyMode::FullValue => "fullvalue",
            IdStrategyMode::PartialKey => "partialkey",
            IdStrategyMode::PartialValue => "partialvalue",
            IdStrategyMode::ProvidedInKey => "providedinkey",
            IdStrategyMode::ProvidedInValue => "providedinvalue",
        }
    }
}

impl FromStr for IdStrategyMode {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.to_ascii_lowercase().as_str() {
            "objectid" => IdStrategyMode::ObjectId,
            "uuid" => IdStrategyMode::Uuid,
            "sourcemeta" => IdStrategyMode::SourceMeta,
            "fullkey" => IdStrategyMode::FullKey,
            "fullvalue" => IdStrategyMode::FullValue,
            "partialkey" => IdStrategyMode::PartialKey,
            "partialvalue" => IdStrategyMode::PartialValue,
            "providedinkey" => IdStrategyMode::ProvidedInKey,
            "providedinvalue" => IdStrategyMode::ProvidedInValue,
            _ => {
                return Err(SinkError::UnknownIdentityMode {
                    key: schema::DOCUMENT_ID_STRATEGY,
                    value: s.to_string(),
                })
            }
        };
        Ok(mode)
    }
}

impl fmt::Display for IdStrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the `_id` of the document written for a record
pub trait IdStrategy: Send + Sync + fmt::Debug {
    fn generate_id(&self, doc: &SinkDocument, coords: &RecordCoordinates) -> SinkResult<Value>;

    fn mode(&self) -> IdStrategyMode;
}

/// Fresh BSON ObjectId, rendered as extended JSON `{"$oid": ...}`
#[derive(Debug, Default)]
pub struct ObjectIdStrategy;

impl IdStrategy for ObjectIdStrategy {
    fn generate_id(&self, _doc: &SinkDocument, _coords: &RecordCoordinates) -> SinkResult<Value> {
        Ok(json!({ "$oid": ObjectId::new().to_hex() }))
    }

    fn mode(&self) -> IdStrategyMode {
        IdStrategyMode::ObjectId
    }
}

/// Random v4 UUID string
#[derive(Debug, Default)]
pub struct UuidStrategy;

impl IdStrategy for UuidStrategy {
    fn generate_id(&self, _doc: &SinkDocument, _coords: &RecordCoordinates) -> SinkResult<Value> {
        Ok(Value::String(Uuid::new_v4().to_string()))
    }

    fn mode(&self) -> IdStrategyMode {
        IdStrategyMode::Uuid
    }
}

/// `{topic}#{partition}#{offset}`, stable across redeliveries
#[derive(Debug, Default)]
pub struct SourceMetaStrategy;

impl IdStrategy for SourceMetaStrategy {
    fn generate_id(&self, _doc: &SinkDocument, coords: &RecordCoordinates) -> SinkResult<Value> {
        Ok(Value::String(format!(
            "{}#{}#{}",
            coords.topic, coords.partition, coords.offset
        )))
    }

    fn mode(&self) -> IdStrategyMode {
        IdStrategyMode::SourceMeta
    }
}

/// The whole key document; an absent key yields an empty document
#[derive(Debug, Default)]
pub struct FullKeyStrategy;

impl IdStrategy for FullKeyStrategy {
    fn generate_id(&self, doc: &SinkDocument, _coords: &RecordCoordinates) -> SinkResult<Value> {
        Ok(Value::Object(doc.key.clone().unwrap_or_default()))
    }

    fn mode(&self) -> IdStrategyMode {
        IdStrategyMode::FullKey
    }
}

/// The whole value document; an absent value yields an empty document
#[derive(Debug, Default)]
pub struct FullValueStrategy;

impl IdStrategy for FullValueStrategy {
    fn generate_id(&self, doc: &SinkDocument, _coords: &RecordCoordinates) -> SinkResult<Value> {
        Ok(Value::Object(doc.value.clone().unwrap_or_default()))
    }

    fn mode(&self) -> IdStrategyMode {
        IdStrategyMode::FullValue
    }
}

/// The key document narrowed by the key projection
#[derive(Debug)]
pub struct PartialKeyStrategy {
    projection: ProjectionPolicy,
}

impl PartialKeyStrategy {
    pub fn new(projection: ProjectionPolicy) -> Self {
        Self { projection }
    }
}

impl IdStrategy for PartialKeyStrategy {
    fn generate_id(&self, doc: &SinkDocument, _coords: &RecordCoordinates) -> SinkResult<Value> {
        Ok(Value::Object(projected(&doc.key, &self.projection)))
    }

    fn mode(&self) -> IdStrategyMode {
        IdStrategyMode::PartialKey
    }
}

/// The value document narrowed by the key projection
#[derive(Debug)]
pub struct PartialValueStrategy {
    projection: ProjectionPolicy,
}

impl PartialValueStrategy {
    pub fn new(projection: ProjectionPolicy) -> Self {
        Self { projection }
    }
}

impl IdStrategy for PartialValueStrategy {
    fn generate_id(&self, doc: &SinkDocument, _coords: &RecordCoordinates) -> SinkResult<Value> {
        Ok(Value::Object(projected(&doc.value, &self.projection)))
    }

    fn mode(&self) -> IdStrategyMode {
        IdStrategyMode::PartialValue
    }
}

fn projected(side: &Option<Document>, projection: &ProjectionPolicy) -> Document {
    let mut copy = side.clone().unwrap_or_default();
    projection.apply(&mut copy);
    copy
}

/// The `_id` field already present in the key or value document
#[derive(Debug)]
pub struct ProvidedStrategy {
    side: Side,
}

impl ProvidedStrategy {
    pub fn new(side: Side) -> Self {
        Self { side }
    }
}

impl IdStrategy for ProvidedStrategy {
    fn generate_id(&self, doc: &SinkDocument, _coords: &RecordCoordinates) -> SinkResult<Value> {
        match self.side.of(doc).and_then(|d| d.get(ID_FIELD)) {
            Some(Value::Null) | None => Err(SinkError::MissingProvidedId {
                side: self.side.as_str(),
            }),
            Some(id) => Ok(id.clone()),
        }
    }

    fn mode(&self) -> IdStrategyMode {
        match self.side {
            Side::Key => IdStrategyMode::ProvidedInKey,
            Side::Value => IdStrategyMode::ProvidedInValue,
        }
    }
}

/// Pick the configured id strategy, wiring in the key projection where needed
pub fn select_strategy(config: &ValidatedConfig) -> SinkResult<Arc<dyn IdStrategy>> {
    let mode = config.id_strategy();
    debug!("selecting document id strategy '{}'", mode);

    let strategy: Arc<dyn IdStrategy> = match mode {
        IdStrategyMode::ObjectId => Arc::new(ObjectIdStrategy),
        IdStrategyMode::Uuid => Arc::new(UuidStrategy),
        IdStrategyMode::SourceMeta => Arc::new(SourceMetaStrategy),
        IdStrategyMode::FullKey => Arc::new(FullKeyStrategy),
        IdStrategyMode::FullValue => Arc::new(FullValueStrategy),
        IdStrategyMode::PartialKey => Arc::new(PartialKeyStrategy::new(key_projection(config, mode)?)),
        IdStrategyMode::PartialValue => {
            Arc::new(PartialValueStrategy::new(key_projection(config, mode)?))
        }
        IdStrategyMode::ProvidedInKey => Arc::new(ProvidedStrategy::new(Side::Key)),
        IdStrategyMode::ProvidedInValue => Arc::new(ProvidedStrategy::new(Side::Value)),
    };
    Ok(strategy)
}

fn key_projection(config: &ValidatedConfig, mode: IdStrategyMode) -> SinkResult<ProjectionPolicy> {
    if config.key_projection_type() == ProjectionMode::None {
        return Err(SinkError::ProjectionRequired {
            strategy: mode.as_str(),
            key: schema::KEY_PROJECTION_TYPE,
        });
    }
    Ok(ProjectionPolicy::for_key(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> ValidatedConfig {
        let raw: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        validate(&raw).unwrap()
    }

    fn record() -> (SinkDocument, RecordCoordinates) {
        let doc = SinkDocument::from_json(
            Some(json!({"tenant": "acme", "seq": 9, "_id": "key-id"})),
            Some(json!({"tenant": "acme", "seq": 9, "amount": 12.5, "_id": "value-id"})),
        )
        .unwrap();
        (doc, RecordCoordinates::new("/default/payments", 2, 1337))
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("PartialKey".parse::<IdStrategyMode>().unwrap(), IdStrategyMode::PartialKey);
        let err = "sequence".parse::<IdStrategyMode>().unwrap_err();
        assert!(matches!(
            err,
            SinkError::UnknownIdentityMode { key: "mongodb.document.id.strategy", ref value }
                if value == "sequence"
        ));
        assert!(err.to_string().contains("mongodb.document.id.strategy"));
        for name in IdStrategyMode::NAMES {
            assert_eq!(name.parse::<IdStrategyMode>().unwrap().as_str(), *name);
        }
    }

    #[test]
    fn test_generated_ids_ignore_content() {
        let (doc, coords) = record();

        let oid = select_strategy(&config(&[])).unwrap();
        assert_eq!(oid.mode(), IdStrategyMode::ObjectId);
        let id = oid.generate_id(&doc, &coords).unwrap();
        assert_eq!(id["$oid"].as_str().map(str::len), Some(24));
        assert_ne!(id, oid.generate_id(&doc, &coords).unwrap());

        let uuid = select_strategy(&config(&[("mongodb.document.id.strategy", "uuid")])).unwrap();
        let id = uuid.generate_id(&doc, &coords).unwrap();
        assert!(Uuid::parse_str(id.as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_source_meta() {
        let (doc, coords) = record();
        let strategy =
            select_strategy(&config(&[("mongodb.document.id.strategy", "SOURCEMETA")])).unwrap();
        assert_eq!(
            strategy.generate_id(&doc, &coords).unwrap(),
            json!("/default/payments#2#1337")
        );
    }

    #[test]
    fn test_full_key_and_value() {
        let (doc, coords) = record();

        let key = select_strategy(&config(&[("mongodb.document.id.strategy", "fullkey")])).unwrap();
        assert_eq!(
            key.generate_id(&doc, &coords).unwrap(),
            json!({"tenant": "acme", "seq": 9, "_id": "key-id"})
        );

        let value =
            select_strategy(&config(&[("mongodb.document.id.strategy", "fullvalue")])).unwrap();
        assert_eq!(
            value.generate_id(&doc, &coords).unwrap()["amount"],
            json!(12.5)
        );

        let empty = SinkDocument::default();
        assert_eq!(key.generate_id(&empty, &coords).unwrap(), json!({}));
    }

    #[test]
    fn test_partial_key() {
        let (doc, coords) = record();
        let strategy = select_strategy(&config(&[
            ("mongodb.document.id.strategy", "partialkey"),
            ("mongodb.key.projection.type", "blacklist"),
            ("mongodb.key.projection.list", "seq"),
        ]))
        .unwrap();
        assert_eq!(
            strategy.generate_id(&doc, &coords).unwrap(),
            json!({"tenant": "acme", "_id": "key-id"})
        );
        // the source document is untouched
        assert!(doc.key.as_ref().unwrap().contains_key("seq"));
    }

    #[test]
    fn test_partial_value_uses_key_projection_list() {
        let (doc, coords) = record();
        let strategy = select_strategy(&config(&[
            ("mongodb.document.id.strategy", "partialvalue"),
            ("mongodb.key.projection.type", "whitelist"),
            ("mongodb.key.projection.list", "tenant,seq"),
            ("mongodb.value.projection.type", "whitelist"),
            ("mongodb.value.projection.list", "amount"),
        ]))
        .unwrap();
        assert_eq!(
            strategy.generate_id(&doc, &coords).unwrap(),
            json!({"tenant": "acme", "seq": 9, "_id": "value-id"})
        );
    }

    #[test]
    fn test_partial_requires_projection() {
        for mode in ["partialkey", "partialvalue"] {
            let err = select_strategy(&config(&[("mongodb.document.id.strategy", mode)])).unwrap_err();
            assert!(matches!(err, SinkError::ProjectionRequired { .. }), "{mode}");
        }
    }

    #[test]
    fn test_provided_ids() {
        let (doc, coords) = record();

        let in_key =
            select_strategy(&config(&[("mongodb.document.id.strategy", "providedinkey")])).unwrap();
        assert_eq!(in_key.generate_id(&doc, &coords).unwrap(), json!("key-id"));

        let in_value =
            select_strategy(&config(&[("mongodb.document.id.strategy", "providedinvalue")]))
                .unwrap();
        assert_eq!(in_value.generate_id(&doc, &coords).unwrap(), json!("value-id"));

        let missing = SinkDocument::from_json(Some(json!({"_id": null})), None).unwrap();
        assert!(matches!(
            in_key.generate_id(&missing, &coords),
            Err(SinkError::MissingProvidedId { side: "key" })
        ));
        assert!(matches!(
            in_value.generate_id(&missing, &coords),
            Err(SinkError::MissingProvidedId { side: "value" })
        ));
    }
}
