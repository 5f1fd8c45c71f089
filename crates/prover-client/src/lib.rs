//! REST client for the DVC proving service
//!
//! The service stores compiled programs and runs proving tasks over
//! attestation artifacts. Every call is a single request with no retry.

pub mod client;
pub mod models;

pub use client::{ProverClient, DEFAULT_TIMEOUT, DVC_SERVICE_URL_VAR};
pub use models::{
    ProgramMetadata, ProgramRecord, ProverKind, SubmitTaskOptions, SubmittedTask, TaskRecord,
    TaskStatus, UploadedProgram,
};
