use std::ops::ControlFlow;
use std::sync::Arc;

use serde_json::Value;

use crate::config::ValidatedConfig;
use crate::error::SinkResult;
use crate::record::{RecordCoordinates, SinkDocument};

use super::{PostProcessor, SOURCE_METADATA_ADDER};

pub const TOPIC_PARTITION_OFFSET_FIELD: &str = "topic-partition-offset";
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Adds the record's origin to the value document
#[derive(Debug, Default)]
pub struct SourceMetadataAdder;

impl PostProcessor for SourceMetadataAdder {
    fn process(
        &self,
        doc: &mut SinkDocument,
        coords: &RecordCoordinates,
    ) -> SinkResult<ControlFlow<()>> {
        if let Some(value) = doc.value.as_mut() {
            value.insert(
                TOPIC_PARTITION_OFFSET_FIELD.to_string(),
                Value::String(format!(
                    "{}-{}-{}",
                    coords.topic, coords.partition, coords.offset
                )),
            );
            if let Some(timestamp) = coords.timestamp_rfc3339() {
                value.insert(TIMESTAMP_FIELD.to_string(), Value::String(timestamp));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn name(&self) -> &str {
        SOURCE_METADATA_ADDER
    }
}

pub(crate) fn create(_config: &ValidatedConfig) -> SinkResult<Arc<dyn PostProcessor>> {
    Ok(Arc::new(SourceMetadataAdder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_adds_coordinates() {
        let mut doc = SinkDocument::from_json(None, Some(json!({"n": 1}))).unwrap();
        let coords = RecordCoordinates::new("/default/orders", 1, 99).with_timestamp(0);

        assert!(SourceMetadataAdder
            .process(&mut doc, &coords)
            .unwrap()
            .is_continue());
        assert_eq!(
            Value::Object(doc.value.unwrap()),
            json!({
                "n": 1,
                "topic-partition-offset": "/default/orders-1-99",
                "timestamp": "1970-01-01T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn test_without_timestamp() {
        let mut doc = SinkDocument::from_json(None, Some(json!({}))).unwrap();
        assert!(SourceMetadataAdder
            .process(&mut doc, &RecordCoordinates::new("t", 0, 0))
            .unwrap()
            .is_continue());
        let value = doc.value.unwrap();
        assert_eq!(value.len(), 1);
        assert!(!value.contains_key(TIMESTAMP_FIELD));
    }
}
