//! # Transit Gateway Matrix CLI
//!
//! Runs the whole pipeline: attachments and aliases from the configured
//! source, pairwise reachability classification, HTML (or JSON) rendering,
//! and an atomic write of the result.
//!
//! ```text
//! aws cli | snapshot dir ──> AttachmentCatalog ──> ReachabilityClassifier
//!                                                      │
//!                         transit.html <── render ─────┘
//! ```

pub mod config;
pub mod pipeline;
pub mod report;

pub use config::{ConfigOverrides, MatrixConfig, OutputFormat, SourceKind};
pub use pipeline::{run, run_with_source, RunSummary};
