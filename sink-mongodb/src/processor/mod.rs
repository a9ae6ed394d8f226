//! Post-processor chain
//!
//! A chain is an ordered, immutable list of stages driven by a loop. Each
//! stage mutates the [`SinkDocument`] in place and returns
//! [`ControlFlow::Continue`] to hand the record to the next stage, or
//! [`ControlFlow::Break`] to stop the chain for that record.
//!
//! The chain is declared by `mongodb.post.processor.chain`, a comma separated
//! list of stage identifiers resolved through a [`StageRegistry`]. The
//! [`DOCUMENT_ID_ADDER`] stage is always present exactly once: when the list
//! omits it, it is placed at the head.

pub mod document_id;
pub mod metadata;
pub mod projector;
pub mod registry;
pub mod renamer;

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::debug;

use crate::config::ValidatedConfig;
use crate::error::{SinkError, SinkResult};
use crate::record::{RecordCoordinates, SinkDocument};

pub use document_id::DocumentIdAdder;
pub use metadata::SourceMetadataAdder;
pub use projector::FieldProjector;
pub use registry::{StageFactory, StageRegistry};
pub use renamer::FieldRenamer;

/// Identifier of the mandatory stage inserting `_id`
pub const DOCUMENT_ID_ADDER: &str = "document-id-adder";
pub const BLACKLIST_KEY_PROJECTOR: &str = "blacklist-key-projector";
pub const BLACKLIST_VALUE_PROJECTOR: &str = "blacklist-value-projector";
pub const WHITELIST_KEY_PROJECTOR: &str = "whitelist-key-projector";
pub const WHITELIST_VALUE_PROJECTOR: &str = "whitelist-value-projector";
pub const RENAME_BY_MAPPING: &str = "rename-by-mapping";
pub const RENAME_BY_REGEXP: &str = "rename-by-regexp";
pub const SOURCE_METADATA_ADDER: &str = "source-metadata-adder";

/// Separator of the stage identifiers in the chain setting
pub const CHAIN_SEPARATOR: char = ',';

/// One record transformation stage
pub trait PostProcessor: Send + Sync {
    fn process(
        &self,
        doc: &mut SinkDocument,
        coords: &RecordCoordinates,
    ) -> SinkResult<ControlFlow<()>>;

    /// Identifier the stage is registered under
    fn name(&self) -> &str;
}

/// Ordered stages, read-only once built
#[derive(Clone, Default)]
pub struct ProcessorChain {
    stages: Vec<Arc<dyn PostProcessor>>,
}

impl ProcessorChain {
    pub fn new(stages: Vec<Arc<dyn PostProcessor>>) -> Self {
        Self { stages }
    }

    /// Drive the record through every stage in order
    ///
    /// Returns `Break` if a stage halted the chain.
    pub fn process(
        &self,
        doc: &mut SinkDocument,
        coords: &RecordCoordinates,
    ) -> SinkResult<ControlFlow<()>> {
        for stage in &self.stages {
            if stage.process(doc, coords)?.is_break() {
                debug!(
                    "post processor '{}' halted the chain for {}@{}",
                    stage.name(),
                    coords.topic,
                    coords.offset
                );
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }
}

impl fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorChain")
            .field("stages", &self.names())
            .finish()
    }
}

/// Build the configured chain from the built-in stages
pub fn build_chain(config: &ValidatedConfig) -> SinkResult<ProcessorChain> {
    build_chain_with(config, &StageRegistry::builtin())
}

/// Build the configured chain, resolving identifiers through `registry`
pub fn build_chain_with(
    config: &ValidatedConfig,
    registry: &StageRegistry,
) -> SinkResult<ProcessorChain> {
    let declared = declared_stages(config.post_processor_chain());
    let mut stages: Vec<Arc<dyn PostProcessor>> = Vec::with_capacity(declared.len() + 1);

    if !declared.contains(&DOCUMENT_ID_ADDER) {
        debug!(
            "'{}' not declared, placing it at the head of the chain",
            DOCUMENT_ID_ADDER
        );
        stages.push(instantiate(registry, DOCUMENT_ID_ADDER, config)?);
    }

    for identifier in declared {
        stages.push(instantiate(registry, identifier, config)?);
    }

    let chain = ProcessorChain::new(stages);
    debug!("built post processor chain {:?}", chain.names());
    Ok(chain)
}

/// Trimmed, non-empty identifiers; first occurrence wins on repeats
fn declared_stages(setting: &str) -> Vec<&str> {
    let mut declared: Vec<&str> = Vec::new();
    for identifier in setting
        .split(CHAIN_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        if !declared.contains(&identifier) {
            declared.push(identifier);
        }
    }
    declared
}

fn instantiate(
    registry: &StageRegistry,
    identifier: &str,
    config: &ValidatedConfig,
) -> SinkResult<Arc<dyn PostProcessor>> {
    let factory = registry.get(identifier).ok_or_else(|| {
        SinkError::stage(identifier, "no post processor is registered under this identifier")
    })?;

    factory(config).map_err(|e| SinkError::StageInstantiation {
        stage: identifier.to_string(),
        reason: "construction failed".to_string(),
        source: Some(Box::new(e)),
    })
}
