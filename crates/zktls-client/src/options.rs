//! Per-call orchestration options

use std::fmt;
use std::sync::Arc;

use dvc_common::RequestParams;
use serde::{Deserialize, Serialize};

/// Default TLS cipher suite used for attested sessions
pub const DEFAULT_SSL_CIPHER: &str = "ECDHE-RSA-AES128-GCM-SHA256";

/// Producer of fresh request parameters, called once per attest attempt
pub type RequestParamsCallback = Arc<dyn Fn() -> anyhow::Result<RequestParams> + Send + Sync>;

/// Attestation mode requested from the network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlgorithmType {
    Mpctls,
    Proxytls,
    Other(String),
}

impl From<String> for AlgorithmType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "mpctls" => AlgorithmType::Mpctls,
            "proxytls" => AlgorithmType::Proxytls,
            _ => AlgorithmType::Other(value),
        }
    }
}

impl From<&str> for AlgorithmType {
    fn from(value: &str) -> Self {
        AlgorithmType::from(value.to_string())
    }
}

impl From<AlgorithmType> for String {
    fn from(value: AlgorithmType) -> Self {
        match value {
            AlgorithmType::Mpctls => "mpctls".to_string(),
            AlgorithmType::Proxytls => "proxytls".to_string(),
            AlgorithmType::Other(other) => other,
        }
    }
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

/// Options for one `do_zktls` call
///
/// Start from `ZktlsOptions::default()` and override fields with struct
/// update syntax; the value is moved into the call.
#[derive(Clone)]
pub struct ZktlsOptions {
    pub ssl_cipher: String,
    pub algorithm_type: AlgorithmType,
    pub special_task: Option<String>,
    /// Disable proxy based interception on the attestor side
    pub no_proxy: bool,
    /// Whether the caller will run a zkVM program on the result
    pub run_zkvm: bool,
    /// Regenerates requests on every attest attempt (e.g. to re-sign them)
    pub request_params_callback: Option<RequestParamsCallback>,
}

impl Default for ZktlsOptions {
    fn default() -> Self {
        Self {
            ssl_cipher: DEFAULT_SSL_CIPHER.to_string(),
            algorithm_type: AlgorithmType::Mpctls,
            special_task: None,
            no_proxy: true,
            run_zkvm: true,
            request_params_callback: None,
        }
    }
}

impl fmt::Debug for ZktlsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZktlsOptions")
            .field("ssl_cipher", &self.ssl_cipher)
            .field("algorithm_type", &self.algorithm_type)
            .field("special_task", &self.special_task)
            .field("no_proxy", &self.no_proxy)
            .field("run_zkvm", &self.run_zkvm)
            .field(
                "request_params_callback",
                &self.request_params_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ZktlsOptions {
    pub fn with_request_params_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn() -> anyhow::Result<RequestParams> + Send + Sync + 'static,
    {
        self.request_params_callback = Some(Arc::new(callback));
        self
    }

    /// Parameters for the next attest attempt
    pub(crate) fn request_params(&self, initial: &RequestParams) -> anyhow::Result<RequestParams> {
        match &self.request_params_callback {
            Some(callback) => callback(),
            None => Ok(initial.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvc_common::RequestDescriptor;

    #[test]
    fn test_defaults() {
        let opts = ZktlsOptions::default();
        assert_eq!(opts.ssl_cipher, "ECDHE-RSA-AES128-GCM-SHA256");
        assert_eq!(opts.algorithm_type, AlgorithmType::Mpctls);
        assert!(opts.special_task.is_none());
        assert!(opts.no_proxy);
        assert!(opts.run_zkvm);
        assert!(opts.request_params_callback.is_none());
    }

    #[test]
    fn test_overrides_keep_other_defaults() {
        let opts = ZktlsOptions {
            algorithm_type: "proxytls".into(),
            no_proxy: false,
            ..Default::default()
        };
        assert_eq!(opts.algorithm_type, AlgorithmType::Proxytls);
        assert!(!opts.no_proxy);
        assert_eq!(opts.ssl_cipher, DEFAULT_SSL_CIPHER);
    }

    #[test]
    fn test_callback_replaces_initial_params() {
        let initial = RequestParams::single(RequestDescriptor::get("https://initial"), vec![]);
        let opts = ZktlsOptions::default().with_request_params_callback(|| {
            Ok(RequestParams::single(RequestDescriptor::get("https://fresh"), vec![]))
        });

        let params = opts.request_params(&initial).unwrap();
        assert_eq!(params.requests[0].url, "https://fresh");
        assert!(format!("{:?}", opts).contains("<callback>"));
    }
}
