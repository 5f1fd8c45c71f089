//! zkTLS orchestration
//!
//! One `do_zktls` call walks the attestation network through a fixed
//! sequence of steps:
//!
//! 1. validate the request shape and chain bindings
//! 2. initialize the gateway session (fatal on failure)
//! 3. submit the task (retried)
//! 4. attest (retried, requests regenerated per attempt if configured)
//! 5. verify and poll the task result (retried)
//! 6. fetch the plain JSON responses and assemble the artifact (fatal on failure)
//!
//! Any failure is reported once as `ZKTLS execution failed: ...`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use dvc_common::{
    AttestParams, AttestResult, Error, RequestParams, Result, SubmitResult, TaskResult,
    ZkVmRequestData,
};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::{ChainConfig, ChainCredentials};
use crate::gateway::{AttestationGateway, FullAttestParams, INIT_MODE_NATIVE};
use crate::options::ZktlsOptions;
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Upper bound on a single attest call
pub const ATTEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Orchestrates attestations through an injected gateway
pub struct ZktlsClient<G> {
    gateway: G,
    chain: ChainConfig,
    attest_params: AttestParams,
}

impl<G: AttestationGateway> ZktlsClient<G> {
    pub fn new(gateway: G, chain: ChainConfig) -> Self {
        Self {
            gateway,
            chain,
            attest_params: AttestParams::default(),
        }
    }

    /// Bind sessions to a different attesting identity
    pub fn with_attest_params(mut self, attest_params: AttestParams) -> Self {
        self.attest_params = attest_params;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Attest `params` and return the zkVM request data
    pub async fn do_zktls(
        &self,
        params: RequestParams,
        options: ZktlsOptions,
    ) -> Result<ZkVmRequestData> {
        let start = Instant::now();

        match self.run(&params, &options).await {
            Ok(data) => {
                info!("Total execution time: {}ms", start.elapsed().as_millis());
                Ok(data)
            }
            Err(e) => {
                error!(
                    "ZKTLS execution failed after {}ms: {}",
                    start.elapsed().as_millis(),
                    e
                );
                Err(Error::execution(e))
            }
        }
    }

    async fn run(&self, params: &RequestParams, options: &ZktlsOptions) -> Result<ZkVmRequestData> {
        params.validate()?;
        let credentials = self.chain.credentials()?;
        debug!("Orchestration options: {:?}", options);

        self.initialize(&credentials).await?;

        let submit_result = self.submit_task().await?;
        let attest_result = self.attest(params, options, &submit_result).await?;
        let task_result = self.verify_and_poll(&attest_result).await?;

        self.finalize(task_result, attest_result).await
    }

    async fn initialize(&self, credentials: &ChainCredentials) -> Result<()> {
        info!("Initializing PrimusNetwork on chain {}", credentials.chain_id);

        let signer = credentials
            .signer()
            .map_err(|e| Error::Init(format!("{:#}", e)))?;

        let init_result = self
            .gateway
            .init(Arc::new(signer), credentials.chain_id, INIT_MODE_NATIVE)
            .await
            .map_err(|e| Error::Init(format!("{:#}", e)))?;

        info!("PrimusNetwork initialized: {}", init_result);
        Ok(())
    }

    async fn submit_task(&self) -> Result<SubmitResult> {
        info!("Submitting ZKTLS task...");

        let gateway = &self.gateway;
        let attest_params = &self.attest_params;

        let submit_result = retry_with_backoff(
            "submitTask ZKTLS",
            RetryPolicy::SUBMIT_TASK,
            move || async move { gateway.submit_task(attest_params).await },
        )
        .await?;

        debug!("submitTask result: {:?}", submit_result);
        Ok(submit_result)
    }

    async fn attest(
        &self,
        params: &RequestParams,
        options: &ZktlsOptions,
        submit_result: &SubmitResult,
    ) -> Result<AttestResult> {
        info!("Running attestation...");

        let gateway = &self.gateway;
        let attest_params = &self.attest_params;

        let attest_result = retry_with_backoff("attest", RetryPolicy::ATTEST, move || async move {
            let request_params = options
                .request_params(params)
                .context("request params callback failed")?;
            request_params.validate()?;

            let full_params =
                FullAttestParams::assemble(attest_params, submit_result, request_params, options);

            let result = tokio::time::timeout(
                ATTEST_TIMEOUT,
                gateway.attest(&full_params, ATTEST_TIMEOUT),
            )
            .await
            .map_err(|_| anyhow!("attest timed out after {}ms", ATTEST_TIMEOUT.as_millis()))??;

            result.primary()?;
            Ok::<_, anyhow::Error>(result)
        })
        .await?;

        debug!("attest result: {:?}", attest_result);
        Ok(attest_result)
    }

    async fn verify_and_poll(&self, attest_result: &AttestResult) -> Result<TaskResult> {
        info!("Verifying and polling task result...");

        let gateway = &self.gateway;
        let query = &attest_result.primary()?.task_query();

        let task_result = retry_with_backoff(
            "verifyAndPollTaskResult",
            RetryPolicy::VERIFY_AND_POLL,
            move || async move { gateway.verify_and_poll_task_result(query).await },
        )
        .await?;

        debug!("verifyAndPollTaskResult result: {:?}", task_result);
        Ok(task_result)
    }

    async fn finalize(
        &self,
        task_result: TaskResult,
        attest_result: AttestResult,
    ) -> Result<ZkVmRequestData> {
        let task_id = attest_result.primary()?.task_id.clone();
        debug!("Preparing zkVM request data for task {} ({})", task_id, task_result.0);

        let plain_response = self
            .gateway
            .get_all_json_response(&task_id)
            .await
            .map_err(|e| Error::Gateway(format!("{:#}", e)))?;

        match plain_response {
            Some(plain) if !plain.is_empty() => Ok(ZkVmRequestData::hash_comparison(
                attest_result,
                plain,
                task_id,
            )),
            _ => Err(Error::EmptyPlainResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attest_timeout_is_five_minutes() {
        assert_eq!(ATTEST_TIMEOUT.as_millis(), 300_000);
    }
}
