//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - Generator: model calls that draft, analyze and repair tests
//! - CommandRunner: shell execution of the gate commands
//! - RunLogger: per-run structured logging
//!
//! These traits keep the workflow engine independent of any concrete model
//! backend, process launcher or log sink.

pub mod command_runner;
pub mod generator;
pub mod null_logger;
pub mod run_logger;

pub use command_runner::{CommandOutput, CommandRunner};
pub use generator::{
    AccessibilityResponse, AnalysisResponse, CandidateResponse, FailureListResponse, FixResponse,
    GenerationRequest, GenerationTask, Generator, PlanResponse,
};
pub use null_logger::{LogEntry, MemoryRunLogger, NullRunLogger};
pub use run_logger::RunLogger;
