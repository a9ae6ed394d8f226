//! Record model for MongoDB Sink Connector
//!
//! A [`SinkDocument`] holds the key and value documents of one incoming
//! record while the post-processor chain shapes them. Payloads arrive already
//! deserialized as `serde_json::Value`; only objects (or absence) are accepted.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::{SinkError, SinkResult};

/// Field name holding the document id
pub const ID_FIELD: &str = "_id";

/// A JSON document (object)
pub type Document = Map<String, Value>;

/// Key and value documents of a record being processed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkDocument {
    pub key: Option<Document>,
    pub value: Option<Document>,
}

impl SinkDocument {
    pub fn new(key: Option<Document>, value: Option<Document>) -> Self {
        Self { key, value }
    }

    /// Build from deserialized payloads; `null` means the side is absent
    pub fn from_json(key: Option<Value>, value: Option<Value>) -> SinkResult<Self> {
        Ok(Self {
            key: into_document(Side::Key.as_str(), key)?,
            value: into_document(Side::Value.as_str(), value)?,
        })
    }
}

/// One of the two documents of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Key,
    Value,
}

impl Side {
    /// Path prefix used by projection and rename lookups
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Key => "key",
            Side::Value => "value",
        }
    }

    pub fn of<'a>(&self, doc: &'a SinkDocument) -> Option<&'a Document> {
        match self {
            Side::Key => doc.key.as_ref(),
            Side::Value => doc.value.as_ref(),
        }
    }

    pub fn of_mut<'a>(&self, doc: &'a mut SinkDocument) -> Option<&'a mut Document> {
        match self {
            Side::Key => doc.key.as_mut(),
            Side::Value => doc.value.as_mut(),
        }
    }
}

fn into_document(side: &'static str, payload: Option<Value>) -> SinkResult<Option<Document>> {
    match payload {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(SinkError::InvalidDocument {
            side,
            found: json_type_name(&other).to_string(),
        }),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Where a record came from on the streaming platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCoordinates {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    /// Publish time in milliseconds since the epoch, when known
    pub timestamp_ms: Option<i64>,
}

impl RecordCoordinates {
    pub fn new(topic: impl Into<String>, partition: u32, offset: u64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            timestamp_ms: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Publish time as RFC 3339, if the record carries one
    pub fn timestamp_rfc3339(&self) -> Option<String> {
        let datetime: DateTime<Utc> = DateTime::from_timestamp_millis(self.timestamp_ms?)?;
        Some(datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}
