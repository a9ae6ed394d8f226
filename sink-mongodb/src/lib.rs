//! MongoDB Sink Connector for Danube Connect
//!
//! This crate turns the connector's flat string settings into the artifacts the
//! sink runtime drives at write time: a validated configuration, a MongoDB
//! connection descriptor and a post-processor chain shaping every record
//! before it is written.
//!
//! # Features
//!
//! - **Validated Settings**: Typed, range and enumerator checked, with defaults
//! - **Authentication**: SCRAM-SHA-1 credentials embedded in the connection URI
//! - **Field Projection**: Block-list or allow-list of key/value fields, with `*` and `**` wildcards
//! - **Field Renaming**: Exact path mappings and regular expression rules
//! - **Document Ids**: ObjectId, UUID, source coordinates, full or partial key/value, or provided `_id`
//! - **Post-Processor Chain**: Ordered stages resolved through a registry of factories
//!
//! # Example Configuration
//!
//! ```toml
//! [mongodb]
//! host = "localhost"
//! port = 27017
//! database = "shop"
//! collection = "orders"
//! writeconcern = "majority"
//!
//! auth.active = true
//! auth.mode = "SCRAM-SHA-1"
//! username = "writer"
//! # password from MONGODB_PASSWORD
//!
//! document.id.strategy = "partialkey"
//! key.projection.type = "whitelist"
//! key.projection.list = "tenant,order_id"
//!
//! post.processor.chain = "document-id-adder,rename-by-mapping,source-metadata-adder"
//! field.renamer.mapping = '[{"oldName":"value.qty","newName":"quantity"}]'
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod id_strategy;
pub mod pipeline;
pub mod processor;
pub mod projection;
pub mod record;
pub mod rename;

pub use config::{validate, RetrySettings, ValidatedConfig};
pub use connection::{AuthMechanism, ConnectionDescriptor, Credentials};
pub use error::{SinkError, SinkResult};
pub use id_strategy::{select_strategy, IdStrategy, IdStrategyMode};
pub use pipeline::SinkPipeline;
pub use processor::{build_chain, build_chain_with, PostProcessor, ProcessorChain, StageRegistry};
pub use projection::{ProjectionMode, ProjectionPolicy};
pub use record::{RecordCoordinates, SinkDocument};
pub use rename::RenameRuleSet;
