//! Interface to the attestation network

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dvc_common::{
    AttestParams, AttestResult, RequestDescriptor, RequestParams, ResponseResolveRule,
    SubmitResult, TaskQuery, TaskResult,
};
use ethers::prelude::{Http, LocalWallet, Provider, SignerMiddleware};
use serde::Serialize;

use crate::options::{AlgorithmType, ZktlsOptions};

/// Wallet bound to a JSON-RPC provider, used to open a gateway session
pub type ChainSigner = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Session mode passed to `init`
pub const INIT_MODE_NATIVE: &str = "native";

/// Operations of the attestation network client
///
/// Implementations hold their own session state; `init` is called at the
/// start of every orchestration run.
#[async_trait]
pub trait AttestationGateway: Send + Sync {
    /// Bind the session to a wallet and chain
    async fn init(
        &self,
        signer: Arc<ChainSigner>,
        chain_id: u64,
        mode: &str,
    ) -> anyhow::Result<serde_json::Value>;

    /// Reserve an attestation task for the given identity
    async fn submit_task(&self, params: &AttestParams) -> anyhow::Result<SubmitResult>;

    /// Run the attested TLS session(s)
    async fn attest(
        &self,
        params: &FullAttestParams,
        timeout: Duration,
    ) -> anyhow::Result<AttestResult>;

    async fn verify_and_poll_task_result(&self, query: &TaskQuery) -> anyhow::Result<TaskResult>;

    /// Plain JSON responses recorded for a task, `None` if unavailable
    async fn get_all_json_response(&self, task_id: &str) -> anyhow::Result<Option<String>>;
}

#[async_trait]
impl<G: AttestationGateway + ?Sized> AttestationGateway for Arc<G> {
    async fn init(
        &self,
        signer: Arc<ChainSigner>,
        chain_id: u64,
        mode: &str,
    ) -> anyhow::Result<serde_json::Value> {
        (**self).init(signer, chain_id, mode).await
    }

    async fn submit_task(&self, params: &AttestParams) -> anyhow::Result<SubmitResult> {
        (**self).submit_task(params).await
    }

    async fn attest(
        &self,
        params: &FullAttestParams,
        timeout: Duration,
    ) -> anyhow::Result<AttestResult> {
        (**self).attest(params, timeout).await
    }

    async fn verify_and_poll_task_result(&self, query: &TaskQuery) -> anyhow::Result<TaskResult> {
        (**self).verify_and_poll_task_result(query).await
    }

    async fn get_all_json_response(&self, task_id: &str) -> anyhow::Result<Option<String>> {
        (**self).get_all_json_response(task_id).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttMode {
    pub algorithm_type: AlgorithmType,
}

/// Everything the network needs for one attest call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullAttestParams {
    #[serde(flatten)]
    pub identity: AttestParams,
    #[serde(flatten)]
    pub submit_result: SubmitResult,
    pub requests: Vec<RequestDescriptor>,
    pub response_resolves: Vec<Vec<ResponseResolveRule>>,
    pub ssl_cipher: String,
    pub att_mode: AttMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_task: Option<String>,
    pub no_proxy: bool,
    /// Always "true": the plain responses are needed for the artifact
    pub get_all_json_response: String,
}

impl FullAttestParams {
    pub fn assemble(
        identity: &AttestParams,
        submit_result: &SubmitResult,
        request_params: RequestParams,
        options: &ZktlsOptions,
    ) -> Self {
        Self {
            identity: identity.clone(),
            submit_result: submit_result.clone(),
            requests: request_params.requests,
            response_resolves: request_params.response_resolves,
            ssl_cipher: options.ssl_cipher.clone(),
            att_mode: AttMode {
                algorithm_type: options.algorithm_type.clone(),
            },
            special_task: options.special_task.clone(),
            no_proxy: options.no_proxy,
            get_all_json_response: "true".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvc_common::ResolveOp;
    use serde_json::json;

    #[test]
    fn test_full_params_wire_format() {
        let mut token = serde_json::Map::new();
        token.insert("taskId".to_string(), json!("task-1"));
        token.insert("attestorUrl".to_string(), json!("wss://attestor"));

        let params = RequestParams::single(
            RequestDescriptor::get("https://x"),
            vec![ResponseResolveRule::json("h", "$", ResolveOp::Sha256Ex)],
        );
        let full = FullAttestParams::assemble(
            &AttestParams::default(),
            &SubmitResult(token),
            params,
            &ZktlsOptions::default(),
        );

        let value = serde_json::to_value(&full).unwrap();
        assert_eq!(value["address"], dvc_common::DEFAULT_ATTESTOR_ADDRESS);
        assert_eq!(value["taskId"], "task-1");
        assert_eq!(value["attestorUrl"], "wss://attestor");
        assert_eq!(value["requests"][0]["url"], "https://x");
        assert_eq!(value["responseResolves"][0][0]["op"], "SHA256_EX");
        assert_eq!(value["sslCipher"], "ECDHE-RSA-AES128-GCM-SHA256");
        assert_eq!(value["attMode"], json!({"algorithmType": "mpctls"}));
        assert_eq!(value["noProxy"], true);
        assert_eq!(value["getAllJsonResponse"], "true");
        assert!(value.get("specialTask").is_none());
    }
}
