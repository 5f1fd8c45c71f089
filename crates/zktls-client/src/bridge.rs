//! Gateway backed by an HTTP bridge to the attestation network SDK
//!
//! Each gateway operation is a JSON POST to `{base_url}/{operation}`. The
//! private key never leaves this process: `init` sends the wallet address
//! together with a signature over the session parameters.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use dvc_common::{AttestParams, AttestResult, SubmitResult, TaskQuery, TaskResult};
use ethers::prelude::Signer;
use ethers::utils::to_checksum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GatewayConfig;
use crate::gateway::{AttestationGateway, ChainSigner, FullAttestParams};

/// Slack on top of the attest timeout for the bridge round trip
const ATTEST_TRANSPORT_MARGIN: Duration = Duration::from_secs(10);

/// Client for the attestation bridge
pub struct BridgeGateway {
    base_url: String,
    client: reqwest::Client,
    request_timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitRequest<'a> {
    address: String,
    chain_id: u64,
    mode: &'a str,
    message: String,
    signature: String,
}

#[derive(Debug, Serialize)]
struct AttestRequest<'a> {
    params: &'a FullAttestParams,
    timeout: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonResponseRequest<'a> {
    task_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct JsonResponseBody {
    #[serde(default)]
    response: Option<String>,
}

impl BridgeGateway {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            request_timeout,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.url.clone(), config.request_timeout)
    }

    async fn call<B, T>(&self, operation: &str, body: &B, timeout: Duration) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), operation);

        debug!("Calling attestation bridge: {}", url);

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach attestation bridge at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("{} returned {}: {}", operation, status, error_text);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse {} response", operation))
    }
}

/// Message signed by the wallet when opening a session
fn init_message(chain_id: u64, mode: &str) -> String {
    format!("primus-network-init:{}:{}", chain_id, mode)
}

#[async_trait]
impl AttestationGateway for BridgeGateway {
    async fn init(
        &self,
        signer: Arc<ChainSigner>,
        chain_id: u64,
        mode: &str,
    ) -> Result<serde_json::Value> {
        let message = init_message(chain_id, mode);
        let signature = signer
            .signer()
            .sign_message(message.as_bytes())
            .await
            .context("Failed to sign init message")?;

        let request = InitRequest {
            address: to_checksum(&signer.address(), None),
            chain_id,
            mode,
            message,
            signature: signature.to_string(),
        };

        self.call("init", &request, self.request_timeout).await
    }

    async fn submit_task(&self, params: &AttestParams) -> Result<SubmitResult> {
        self.call("submitTask", params, self.request_timeout).await
    }

    async fn attest(&self, params: &FullAttestParams, timeout: Duration) -> Result<AttestResult> {
        let request = AttestRequest {
            params,
            timeout: timeout.as_millis() as u64,
        };

        self.call("attest", &request, timeout + ATTEST_TRANSPORT_MARGIN)
            .await
    }

    async fn verify_and_poll_task_result(&self, query: &TaskQuery) -> Result<TaskResult> {
        self.call("verifyAndPollTaskResult", query, self.request_timeout)
            .await
    }

    async fn get_all_json_response(&self, task_id: &str) -> Result<Option<String>> {
        let body: JsonResponseBody = self
            .call(
                "getAllJsonResponse",
                &JsonResponseRequest { task_id },
                self.request_timeout,
            )
            .await?;

        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_creation() {
        let gateway = BridgeGateway::new("http://localhost:8090", Duration::from_secs(30));
        assert_eq!(gateway.base_url, "http://localhost:8090");
        assert_eq!(gateway.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_init_message() {
        assert_eq!(init_message(84532, "native"), "primus-network-init:84532:native");
    }
}
