//! GridLab Runner: configuration, the ingestion stage and the QA stage.
//!
//! This crate builds on `gridlab-core` to provide:
//! - Pipeline configuration with optional `gridlab.toml` overrides
//! - The Aligner (fetch, align, persist the training table)
//! - Atomic CSV persistence
//! - The Validator (structural checks and PNG plots)

pub mod config;
pub mod ingest;
pub mod persist;
pub mod qa;

pub use config::{ConfigError, Credentials, PipelineConfig};
pub use ingest::{build_table, run_ingest, Aligner, BuiltTable, IngestError, IngestSummary};
pub use persist::{read_table, write_table, PersistError};
pub use qa::{run_qa, QaError, QaReport, Validator};
