//! Configuration management for the zkTLS client
//!
//! Loads settings from environment variables (and a `.env` file when one
//! exists). Chain credentials are only checked when an orchestration run
//! starts, so a missing key surfaces as an error of that run.

use std::env;
use std::fmt;
use std::time::Duration;

use anyhow::Context;
use dvc_common::{Error, Result};
use ethers::prelude::{Http, LocalWallet, Provider, Signer, SignerMiddleware};

use crate::gateway::ChainSigner;

pub const PRIVATE_KEY_VAR: &str = "PRIVATE_KEY";
pub const CHAIN_ID_VAR: &str = "CHAIN_ID";
pub const RPC_URL_VAR: &str = "RPC_URL";

/// Raw chain bindings as found in the environment
#[derive(Clone, Default)]
pub struct ChainConfig {
    pub private_key: Option<String>,
    pub chain_id: Option<String>,
    pub rpc_url: Option<String>,
}

impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("chain_id", &self.chain_id)
            .field("rpc_url", &self.rpc_url)
            .finish()
    }
}

impl ChainConfig {
    pub fn new(
        private_key: impl Into<String>,
        chain_id: impl Into<String>,
        rpc_url: impl Into<String>,
    ) -> Self {
        Self {
            private_key: Some(private_key.into()),
            chain_id: Some(chain_id.into()),
            rpc_url: Some(rpc_url.into()),
        }
    }

    /// Load chain bindings from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            private_key: read_var(PRIVATE_KEY_VAR),
            chain_id: read_var(CHAIN_ID_VAR),
            rpc_url: read_var(RPC_URL_VAR),
        }
    }

    /// Check that every binding is present and well-formed
    pub fn credentials(&self) -> Result<ChainCredentials> {
        let private_key = require(&self.private_key, PRIVATE_KEY_VAR)?;
        let chain_id = require(&self.chain_id, CHAIN_ID_VAR)?;
        let rpc_url = require(&self.rpc_url, RPC_URL_VAR)?;

        let chain_id = parse_chain_id(chain_id).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "{} must be a decimal or 0x-prefixed hex integer: {}",
                CHAIN_ID_VAR, chain_id
            ))
        })?;

        Ok(ChainCredentials {
            private_key: private_key.to_string(),
            chain_id,
            rpc_url: rpc_url.to_string(),
        })
    }
}

/// Chain ids appear both as `84532` and as `0x14a34` in RPC tooling
fn parse_chain_id(value: &str) -> Option<u64> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn read_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::MissingConfig(name)),
    }
}

/// Validated chain bindings for one run
#[derive(Clone)]
pub struct ChainCredentials {
    private_key: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

impl ChainCredentials {
    /// Build the JSON-RPC provider and wallet used to open a gateway session
    pub fn signer(&self) -> anyhow::Result<ChainSigner> {
        let provider = Provider::<Http>::try_from(self.rpc_url.as_str())
            .with_context(|| format!("Invalid {}: {}", RPC_URL_VAR, self.rpc_url))?;

        let wallet = self
            .private_key
            .parse::<LocalWallet>()
            .with_context(|| format!("Invalid {}", PRIVATE_KEY_VAR))?
            .with_chain_id(self.chain_id);

        Ok(SignerMiddleware::new(provider, wallet))
    }
}

/// How to reach the attestation network
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the attestation bridge
    pub url: String,

    /// Timeout for bridge calls other than `attest`
    pub request_timeout: Duration,

    /// Use the in-process mock gateway instead of the bridge
    pub mock: bool,
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = GatewayConfig {
            url: env::var("ATTESTATION_GATEWAY_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8090".to_string()),

            request_timeout: Duration::from_secs(
                env::var("GATEWAY_REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()
                    .context("Invalid GATEWAY_REQUEST_TIMEOUT_SECS")?,
            ),

            mock: env::var("MOCK_GATEWAY")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("Invalid MOCK_GATEWAY (expected true/false)")?,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !self.mock && self.url.is_empty() {
            anyhow::bail!("ATTESTATION_GATEWAY_URL is required when MOCK_GATEWAY=false");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("GATEWAY_REQUEST_TIMEOUT_SECS must be greater than 0");
        }

        Ok(())
    }
}
