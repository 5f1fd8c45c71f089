//! Mock attestation gateway for development and testing
//!
//! Answers every operation locally with deterministic data. Failures,
//! missing attestations and slow attest calls can be scripted per
//! operation, and every call is counted.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use dvc_common::{
    AttestParams, AttestResult, AttestationRecord, SubmitResult, TaskQuery, TaskResult,
};
use ethers::utils::to_checksum;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::gateway::{AttestationGateway, ChainSigner, FullAttestParams};

/// Number of calls seen per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub init: u32,
    pub submit_task: u32,
    pub attest: u32,
    pub verify_and_poll: u32,
    pub get_all_json_response: u32,
}

impl CallCounts {
    pub fn total(&self) -> u32 {
        self.init
            + self.submit_task
            + self.attest
            + self.verify_and_poll
            + self.get_all_json_response
    }
}

#[derive(Default)]
struct Counters {
    init: AtomicU32,
    submit_task: AtomicU32,
    attest: AtomicU32,
    verify_and_poll: AtomicU32,
    get_all_json_response: AtomicU32,
}

/// Mock attestation network
pub struct MockGateway {
    task_id: String,
    report_tx_hash: String,
    plain_json_response: Option<String>,
    fail_init: bool,
    submit_failures: AtomicU32,
    attest_failures: AtomicU32,
    missing_attestations: AtomicU32,
    slow_attests: AtomicU32,
    attest_delay: Duration,
    verify_failures: AtomicU32,
    counters: Counters,
    last_attest_params: Mutex<Option<Value>>,
}

impl MockGateway {
    /// A gateway that succeeds on the first try at every step
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            report_tx_hash: "0x5f1e3d0c9a7b2e4f6a8c0d1e3f5a7b9c1d3e5f7a9b1c3d5e7f9a1b3c5d7e9f1a".to_string(),
            plain_json_response: Some(r#"{"code":"0","data":[]}"#.to_string()),
            fail_init: false,
            submit_failures: AtomicU32::new(0),
            attest_failures: AtomicU32::new(0),
            missing_attestations: AtomicU32::new(0),
            slow_attests: AtomicU32::new(0),
            attest_delay: Duration::ZERO,
            verify_failures: AtomicU32::new(0),
            counters: Counters::default(),
            last_attest_params: Mutex::new(None),
        }
    }

    pub fn with_plain_json_response(mut self, response: Option<String>) -> Self {
        self.plain_json_response = response;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Fail the first `n` submit calls
    pub fn failing_submits(self, n: u32) -> Self {
        self.submit_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the first `n` attest calls
    pub fn failing_attests(self, n: u32) -> Self {
        self.attest_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Answer the next `n` attest calls with a record lacking an attestation
    pub fn missing_attestations(self, n: u32) -> Self {
        self.missing_attestations.store(n, Ordering::SeqCst);
        self
    }

    /// Delay the next `n` attest calls by `delay` before answering
    pub fn slow_attests(mut self, n: u32, delay: Duration) -> Self {
        self.slow_attests.store(n, Ordering::SeqCst);
        self.attest_delay = delay;
        self
    }

    /// Fail the first `n` verify-and-poll calls
    pub fn failing_verifies(self, n: u32) -> Self {
        self.verify_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            init: self.counters.init.load(Ordering::SeqCst),
            submit_task: self.counters.submit_task.load(Ordering::SeqCst),
            attest: self.counters.attest.load(Ordering::SeqCst),
            verify_and_poll: self.counters.verify_and_poll.load(Ordering::SeqCst),
            get_all_json_response: self.counters.get_all_json_response.load(Ordering::SeqCst),
        }
    }

    /// Parameters of the most recent attest call, as sent on the wire
    pub async fn last_attest_params(&self) -> Option<Value> {
        self.last_attest_params.lock().await.clone()
    }
}

/// Consume one scripted event, if any remain
fn take(remaining: &AtomicU32) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl AttestationGateway for MockGateway {
    async fn init(&self, signer: Arc<ChainSigner>, chain_id: u64, mode: &str) -> Result<Value> {
        self.counters.init.fetch_add(1, Ordering::SeqCst);

        if self.fail_init {
            bail!("mock init failure");
        }

        let address = to_checksum(&signer.address(), None);
        debug!("Mock gateway: init({}, {}, {})", address, chain_id, mode);

        Ok(json!({ "address": address, "chainId": chain_id, "mode": mode }))
    }

    async fn submit_task(&self, params: &AttestParams) -> Result<SubmitResult> {
        self.counters.submit_task.fetch_add(1, Ordering::SeqCst);

        if take(&self.submit_failures) {
            bail!("mock submitTask failure");
        }

        debug!("Mock gateway: submit_task({}) -> {}", params.address, self.task_id);

        let mut token = Map::new();
        token.insert("taskId".to_string(), json!(self.task_id));
        token.insert("taskTxHash".to_string(), json!("0xmocksubmit"));
        token.insert("taskAttestors".to_string(), json!(["0xmockattestor"]));
        Ok(SubmitResult(token))
    }

    async fn attest(&self, params: &FullAttestParams, timeout: Duration) -> Result<AttestResult> {
        let attempt = self.counters.attest.fetch_add(1, Ordering::SeqCst);
        *self.last_attest_params.lock().await = Some(serde_json::to_value(params)?);

        if take(&self.slow_attests) {
            tokio::time::sleep(self.attest_delay).await;
        }

        if take(&self.attest_failures) {
            bail!("mock attest failure");
        }

        debug!(
            "Mock gateway: attest({} requests, timeout {}ms) attempt {}",
            params.requests.len(),
            timeout.as_millis(),
            attempt
        );

        let attestation = if take(&self.missing_attestations) {
            None
        } else {
            Some(json!({
                "recipient": params.identity.address,
                "request": params.requests,
                "signatures": ["0xmocksignature"],
            }))
        };

        Ok(AttestResult(vec![AttestationRecord {
            attestation,
            task_id: self.task_id.clone(),
            report_tx_hash: self.report_tx_hash.clone(),
            extra: Map::new(),
        }]))
    }

    async fn verify_and_poll_task_result(&self, query: &TaskQuery) -> Result<TaskResult> {
        self.counters.verify_and_poll.fetch_add(1, Ordering::SeqCst);

        if take(&self.verify_failures) {
            bail!("mock verifyAndPollTaskResult failure");
        }

        Ok(TaskResult(json!({
            "taskId": query.task_id,
            "reportTxHash": query.report_tx_hash,
            "status": "verified",
        })))
    }

    async fn get_all_json_response(&self, task_id: &str) -> Result<Option<String>> {
        self.counters.get_all_json_response.fetch_add(1, Ordering::SeqCst);
        debug!("Mock gateway: get_all_json_response({})", task_id);
        Ok(self.plain_json_response.clone())
    }
}
