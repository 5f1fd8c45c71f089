//! Signed Binance account request

use std::env;
use std::fmt;

use anyhow::{Context, Result};
use dvc_common::{RequestDescriptor, RequestParams, ResolveOp, ResponseResolveRule};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::RequestParamsSource;

pub const BINANCE_ACCOUNT_URL: &str = "https://api.binance.com/api/v3/account";

pub const API_KEY_VAR: &str = "BINANCE_API_KEY";
pub const API_SECRET_VAR: &str = "BINANCE_API_SECRET";
pub const RECV_WINDOW_VAR: &str = "BINANCE_RECV_WINDOW";

/// Receive window in seconds when none is configured
pub const DEFAULT_RECV_WINDOW_SECS: u64 = 60;

type HmacSha256 = Hmac<Sha256>;

/// API credentials for the Binance account endpoint
#[derive(Clone)]
pub struct BinanceCredentials {
    pub api_key: String,
    api_secret: String,
    pub recv_window_secs: u64,
}

impl fmt::Debug for BinanceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("recv_window_secs", &self.recv_window_secs)
            .finish()
    }
}

impl BinanceCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            recv_window_secs: DEFAULT_RECV_WINDOW_SECS,
        }
    }

    pub fn with_recv_window(mut self, secs: u64) -> Self {
        self.recv_window_secs = secs;
        self
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_values(
            env::var(API_KEY_VAR).ok(),
            env::var(API_SECRET_VAR).ok(),
            env::var(RECV_WINDOW_VAR).ok(),
        )
    }

    fn from_values(
        api_key: Option<String>,
        api_secret: Option<String>,
        recv_window: Option<String>,
    ) -> Result<Self> {
        let (api_key, api_secret) = match (api_key, api_secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => (key, secret),
            _ => anyhow::bail!(
                "Please set {} and {} in the environment or .env",
                API_KEY_VAR,
                API_SECRET_VAR
            ),
        };

        let recv_window_secs = match recv_window.filter(|v| !v.trim().is_empty()) {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", RECV_WINDOW_VAR, value))?,
            None => DEFAULT_RECV_WINDOW_SECS,
        };

        if recv_window_secs == 0 {
            anyhow::bail!("{} must be greater than 0", RECV_WINDOW_VAR);
        }

        Ok(Self {
            api_key,
            api_secret,
            recv_window_secs,
        })
    }

    /// Hex encoded HMAC-SHA256 of `payload` under the API secret
    fn sign(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid HMAC key: {}", e))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// `GET /api/v3/account` signed with the account's API secret
///
/// The response body is committed to by hash.
#[derive(Debug, Clone)]
pub struct BinanceAccountRequest {
    credentials: BinanceCredentials,
}

impl BinanceAccountRequest {
    pub fn new(credentials: BinanceCredentials) -> Self {
        Self { credentials }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(BinanceCredentials::from_env()?))
    }

    /// Build the request as signed at `timestamp_ms`
    pub fn signed_at(&self, timestamp_ms: i64) -> Result<RequestParams> {
        let query = format!(
            "timestamp={}&recvWindow={}&omitZeroBalances=true",
            timestamp_ms,
            self.credentials.recv_window_secs * 1000
        );
        let signature = self.credentials.sign(&query)?;

        let url = format!("{}?{}&signature={}", BINANCE_ACCOUNT_URL, query, signature);
        debug!("Signed Binance account request at {}", timestamp_ms);

        let request =
            RequestDescriptor::get(url).with_header("X-MBX-APIKEY", &self.credentials.api_key);

        Ok(RequestParams::single(
            request,
            vec![ResponseResolveRule::json(
                "hash-of-response",
                "$",
                ResolveOp::Sha256Ex,
            )],
        ))
    }
}

impl RequestParamsSource for BinanceAccountRequest {
    fn request_params(&self) -> Result<RequestParams> {
        self.signed_at(chrono::Utc::now().timestamp_millis())
    }
}
