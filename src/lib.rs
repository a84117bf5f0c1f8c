//! clipdedup - Resumable video sub-clip deduplication.
//!
//! Detects which videos in an object store are sub-clips of longer videos
//! and partitions the collection into groups, each led by its longest
//! ("main") video. Every state transition is checkpointed, so a crashed run
//! resumes without redoing completed downloads, inference or comparisons.
//!
//! Hexagonal architecture:
//! - domain/: the persistent state model (video table, groups, submeta)
//! - ports/: trait seams for the store, decoder, oracle and checkpoint
//! - adapters/: S3-compatible store, ffmpeg decoder, sliding-window
//!   comparator, JSON checkpoint file
//! - application/: extraction, clustering and the end-to-end pipeline
//! - config: environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use application::pipeline::PipelineService;
pub use config::Config;
pub use domain::meta::{PipelineState, VideoRecord};
pub use domain::report::DedupReport;
pub use error::PipelineError;
