//! Block-list and allow-list projector stages
//!
//! There is one stage per projection kind and document side. A stage only
//! projects when the configured projection type of its side matches its kind;
//! otherwise it passes records through.

use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::warn;

use crate::config::ValidatedConfig;
use crate::error::SinkResult;
use crate::projection::{ProjectionMode, ProjectionPolicy};
use crate::record::{RecordCoordinates, Side, SinkDocument};

use super::{
    PostProcessor, BLACKLIST_KEY_PROJECTOR, BLACKLIST_VALUE_PROJECTOR, WHITELIST_KEY_PROJECTOR,
    WHITELIST_VALUE_PROJECTOR,
};

#[derive(Debug, Clone)]
pub struct FieldProjector {
    side: Side,
    kind: ProjectionMode,
    policy: ProjectionPolicy,
}

impl FieldProjector {
    pub fn new(side: Side, kind: ProjectionMode, policy: ProjectionPolicy) -> Self {
        Self { side, kind, policy }
    }

    /// Stage for `side` and `kind`, reading that side's projection settings
    pub fn from_config(config: &ValidatedConfig, side: Side, kind: ProjectionMode) -> Self {
        let policy = match side {
            Side::Key => ProjectionPolicy::for_key(config),
            Side::Value => ProjectionPolicy::for_value(config),
        };
        let projector = Self::new(side, kind, policy);
        if !projector.is_active() {
            warn!(
                "post processor '{}' is in the chain but the {} projection type is '{}', records pass through",
                projector.name(),
                side.as_str(),
                projector.policy.mode()
            );
        }
        projector
    }

    pub fn is_active(&self) -> bool {
        self.kind != ProjectionMode::None && self.policy.mode() == self.kind
    }
}

impl PostProcessor for FieldProjector {
    fn process(
        &self,
        doc: &mut SinkDocument,
        _coords: &RecordCoordinates,
    ) -> SinkResult<ControlFlow<()>> {
        if self.is_active() {
            if let Some(document) = self.side.of_mut(doc) {
                self.policy.apply(document);
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn name(&self) -> &str {
        match (self.kind, self.side) {
            (ProjectionMode::AllowList, Side::Key) => WHITELIST_KEY_PROJECTOR,
            (ProjectionMode::AllowList, Side::Value) => WHITELIST_VALUE_PROJECTOR,
            (_, Side::Key) => BLACKLIST_KEY_PROJECTOR,
            (_, Side::Value) => BLACKLIST_VALUE_PROJECTOR,
        }
    }
}

pub(crate) fn blacklist_key(config: &ValidatedConfig) -> SinkResult<Arc<dyn PostProcessor>> {
    Ok(Arc::new(FieldProjector::from_config(
        config,
        Side::Key,
        ProjectionMode::BlockList,
    )))
}

pub(crate) fn blacklist_value(config: &ValidatedConfig) -> SinkResult<Arc<dyn PostProcessor>> {
    Ok(Arc::new(FieldProjector::from_config(
        config,
        Side::Value,
        ProjectionMode::BlockList,
    )))
}

pub(crate) fn whitelist_key(config: &ValidatedConfig) -> SinkResult<Arc<dyn PostProcessor>> {
    Ok(Arc::new(FieldProjector::from_config(
        config,
        Side::Key,
        ProjectionMode::AllowList,
    )))
}

pub(crate) fn whitelist_value(config: &ValidatedConfig) -> SinkResult<Arc<dyn PostProcessor>> {
    Ok(Arc::new(FieldProjector::from_config(
        config,
        Side::Value,
        ProjectionMode::AllowList,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> ValidatedConfig {
        let raw: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        validate(&raw).unwrap()
    }

    fn record() -> SinkDocument {
        SinkDocument::from_json(
            Some(json!({"id": 1, "region": "eu"})),
            Some(json!({"_id": 5, "name": "a", "secret": "s", "tags": {"x": 1, "y": 2}})),
        )
        .unwrap()
    }

    fn side(doc: &Option<crate::record::Document>) -> Value {
        Value::Object(doc.clone().unwrap_or_default())
    }

    #[test]
    fn test_blacklist_value() {
        let cfg = config(&[
            ("mongodb.value.projection.type", "blacklist"),
            ("mongodb.value.projection.list", "secret,tags.x"),
        ]);
        let stage = blacklist_value(&cfg).unwrap();
        assert_eq!(stage.name(), BLACKLIST_VALUE_PROJECTOR);

        let mut doc = record();
        assert!(stage
            .process(&mut doc, &RecordCoordinates::new("t", 0, 0))
            .unwrap()
            .is_continue());
        assert_eq!(side(&doc.value), json!({"_id": 5, "name": "a", "tags": {"y": 2}}));
        assert_eq!(side(&doc.key), json!({"id": 1, "region": "eu"}));
    }

    #[test]
    fn test_whitelist_key() {
        let cfg = config(&[
            ("mongodb.key.projection.type", "whitelist"),
            ("mongodb.key.projection.list", "id"),
        ]);
        let stage = whitelist_key(&cfg).unwrap();
        let mut doc = record();
        assert!(stage
            .process(&mut doc, &RecordCoordinates::new("t", 0, 0))
            .unwrap()
            .is_continue());
        assert_eq!(side(&doc.key), json!({"id": 1}));
    }

    #[test]
    fn test_mismatched_kind_passes_through() {
        let cfg = config(&[
            ("mongodb.value.projection.type", "whitelist"),
            ("mongodb.value.projection.list", "name"),
        ]);
        let projector = FieldProjector::from_config(&cfg, Side::Value, ProjectionMode::BlockList);
        assert!(!projector.is_active());

        let mut doc = record();
        let before = doc.clone();
        assert!(projector
            .process(&mut doc, &RecordCoordinates::new("t", 0, 0))
            .unwrap()
            .is_continue());
        assert_eq!(doc, before);
    }
}
