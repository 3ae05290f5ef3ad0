//! Music RAG ETL Library
//!
//! Turns cached artist articles and entity facts into vector-store documents
//! and a typed music entity graph.

pub mod audit;
pub mod chunker;
pub mod cli_style;
pub mod config;
pub mod dedup;
pub mod graph;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod qid;
pub mod report;
pub mod sinks;
pub mod sources;
pub mod text;

// Re-export commonly used types for convenience
pub use pipeline::{run_from_config, Pipeline, PipelineOptions};
pub use qid::Qid;
pub use report::{IssueKind, IssueLog, PipelineIssue, RunReport};
