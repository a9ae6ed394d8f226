//! Sink pipeline assembly
//!
//! [`SinkPipeline`] is the object graph handed to the connector runtime at
//! startup: validated settings, the connection descriptor and the processor
//! chain. It is read-only after construction and can be shared across
//! workers. Reconfiguring means building a new pipeline.

use std::collections::HashMap;
use std::ops::ControlFlow;

use tracing::{debug, info};

use crate::config::{validate, RetrySettings, ValidatedConfig};
use crate::connection::ConnectionDescriptor;
use crate::error::SinkResult;
use crate::processor::{build_chain_with, ProcessorChain, StageRegistry};
use crate::record::{RecordCoordinates, SinkDocument};

#[derive(Debug, Clone)]
pub struct SinkPipeline {
    config: ValidatedConfig,
    connection: ConnectionDescriptor,
    chain: ProcessorChain,
}

impl SinkPipeline {
    /// Validate raw properties and assemble the pipeline with the built-in stages
    pub fn from_properties(raw: &HashMap<String, String>) -> SinkResult<Self> {
        Self::from_config(validate(raw)?, &StageRegistry::builtin())
    }

    /// Assemble from already validated settings, resolving stages through `registry`
    pub fn from_config(config: ValidatedConfig, registry: &StageRegistry) -> SinkResult<Self> {
        let connection = ConnectionDescriptor::from_config(&config)?;
        let chain = build_chain_with(&config, registry)?;

        info!(
            "MongoDB sink pipeline ready: {} stage(s), id strategy '{}', target {}.{}",
            chain.len(),
            config.id_strategy(),
            connection.database,
            connection.collection
        );
        debug!("Post processors: {:?}", chain.names());

        Ok(Self {
            config,
            connection,
            chain,
        })
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn connection(&self) -> &ConnectionDescriptor {
        &self.connection
    }

    pub fn chain(&self) -> &ProcessorChain {
        &self.chain
    }

    /// Retry policy for the write path
    pub fn retry_settings(&self) -> RetrySettings {
        self.config.retry_settings()
    }

    /// Run one record through the processor chain
    pub fn process(
        &self,
        doc: &mut SinkDocument,
        coords: &RecordCoordinates,
    ) -> SinkResult<ControlFlow<()>> {
        self.chain.process(doc, coords)
    }
}
