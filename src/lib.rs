//! Chunked transcription pipeline for large media files.
//!
//! Takes an arbitrarily large audio/video file, decides whether it exceeds
//! the remote endpoint's single-payload limit, splits it into byte-range
//! segments when it does, submits each segment sequentially to a remote
//! speech-to-text service, tolerates per-segment failures, and reassembles
//! one ordered transcript. A sibling exporter extracts the same planned
//! segments as standalone downloadable parts.
//!
//! # Known approximation
//! The pipeline never decodes media. Chunk boundaries are raw byte offsets
//! in the original container, not keyframe or sample boundaries, so
//! transcription quality right at a chunk edge is an accepted approximation.
//! Relatedly, the configured chunk overlap is recorded for observability but
//! is not subtracted from segment boundaries and no de-duplication of
//! overlapping text is attempted.

pub mod app;
pub mod cancel;
pub mod client;
pub mod config;
pub mod continuation;
pub mod export;
pub mod media;
pub mod metrics;
pub mod orchestrator;
pub mod planner;

pub use client::{
    ClientError, ResponseFormat, TimestampGranularity, Transcribe, TranscriptionClient,
    TranscriptionOptions, TranscriptionOutput,
};
pub use continuation::ContinuationPolicy;
pub use export::{ExportError, ExportedSegment, OutputFormat};
pub use media::MediaFile;
pub use orchestrator::{Orchestrator, PayloadLimits, PipelineError, PipelineResult};
pub use planner::{PlanError, Segment, Span, SplitPolicy};
