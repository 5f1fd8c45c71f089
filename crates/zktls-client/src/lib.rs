//! zkTLS Client
//!
//! Drives the attestation network through task submission, attestation and
//! verification, and assembles the request data consumed by a zkVM program.
//!
//! **Components:**
//! - `retry`: bounded retry with exponential backoff
//! - `gateway`: interface to the attestation network
//! - `client`: the orchestration pipeline (`ZktlsClient::do_zktls`)
//! - `options`: per-call options
//! - `config`: chain and gateway configuration
//! - `bridge`: gateway backed by an HTTP bridge
//! - `mock_gateway`: in-process gateway for development and testing

pub mod bridge;
pub mod client;
pub mod config;
pub mod gateway;
pub mod mock_gateway;
pub mod options;
pub mod retry;

// Re-export commonly used types
pub use bridge::BridgeGateway;
pub use client::{ZktlsClient, ATTEST_TIMEOUT};
pub use config::{ChainConfig, ChainCredentials, GatewayConfig};
pub use gateway::{AttMode, AttestationGateway, ChainSigner, FullAttestParams, INIT_MODE_NATIVE};
pub use mock_gateway::{CallCounts, MockGateway};
pub use options::{AlgorithmType, RequestParamsCallback, ZktlsOptions, DEFAULT_SSL_CIPHER};
pub use retry::{retry_with_backoff, RetryPolicy};
