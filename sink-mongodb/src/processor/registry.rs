//! Stage registry
//!
//! Maps post-processor identifiers to factories. Every factory receives the
//! validated configuration and returns a ready stage.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ValidatedConfig;
use crate::error::SinkResult;

use super::{
    document_id, metadata, projector, renamer, PostProcessor, BLACKLIST_KEY_PROJECTOR,
    BLACKLIST_VALUE_PROJECTOR, DOCUMENT_ID_ADDER, RENAME_BY_MAPPING, RENAME_BY_REGEXP,
    SOURCE_METADATA_ADDER, WHITELIST_KEY_PROJECTOR, WHITELIST_VALUE_PROJECTOR,
};

/// Builds one stage from the validated configuration
pub type StageFactory = fn(&ValidatedConfig) -> SinkResult<Arc<dyn PostProcessor>>;

#[derive(Clone, Default)]
pub struct StageRegistry {
    factories: HashMap<String, StageFactory>,
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRegistry")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

impl StageRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in stage
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(DOCUMENT_ID_ADDER, document_id::create);
        registry.register(BLACKLIST_KEY_PROJECTOR, projector::blacklist_key);
        registry.register(BLACKLIST_VALUE_PROJECTOR, projector::blacklist_value);
        registry.register(WHITELIST_KEY_PROJECTOR, projector::whitelist_key);
        registry.register(WHITELIST_VALUE_PROJECTOR, projector::whitelist_value);
        registry.register(RENAME_BY_MAPPING, renamer::by_mapping);
        registry.register(RENAME_BY_REGEXP, renamer::by_regexp);
        registry.register(SOURCE_METADATA_ADDER, metadata::create);
        registry
    }

    /// Register a factory, replacing any previous one under the same identifier
    pub fn register(&mut self, identifier: impl Into<String>, factory: StageFactory) {
        self.factories.insert(identifier.into(), factory);
    }

    pub fn get(&self, identifier: &str) -> Option<StageFactory> {
        self.factories.get(identifier).copied()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// Registered identifiers, sorted
    pub fn identifiers(&self) -> Vec<&str> {
        let mut identifiers: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        identifiers.sort_unstable();
        identifiers
    }
}
