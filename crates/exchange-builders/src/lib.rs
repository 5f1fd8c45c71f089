//! Request descriptor builders for exchange APIs
//!
//! Each builder produces the `RequestParams` for one attested call. Signed
//! requests carry a timestamp, so they are rebuilt on every attest attempt
//! by handing the builder to the orchestrator as a request params callback.

pub mod binance;
pub mod okx;

use std::sync::Arc;

use anyhow::Result;
use dvc_common::RequestParams;
use dvc_zktls_client::RequestParamsCallback;

pub use binance::{BinanceAccountRequest, BinanceCredentials, BINANCE_ACCOUNT_URL};
pub use okx::{OkxInstrumentsRequest, OkxRule, OKX_INSTRUMENTS_URL};

/// Anything that can build a fresh set of request parameters
pub trait RequestParamsSource: Send + Sync {
    fn request_params(&self) -> Result<RequestParams>;
}

/// Wrap a source so the orchestrator calls it once per attest attempt
pub fn request_params_callback<S>(source: Arc<S>) -> RequestParamsCallback
where
    S: RequestParamsSource + ?Sized + 'static,
{
    Arc::new(move || source.request_params())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counting(Arc<AtomicU32>);

    impl RequestParamsSource for Counting {
        fn request_params(&self) -> Result<RequestParams> {
            self.0.fetch_add(1, Ordering::SeqCst);
            OkxInstrumentsRequest::default().request_params()
        }
    }

    #[test]
    fn test_callback_rebuilds_each_call() {
        let calls = Arc::new(AtomicU32::new(0));
        let callback = request_params_callback(Arc::new(Counting(calls.clone())));

        let first = callback().unwrap();
        let second = callback().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(first, second);
        assert!(first.validate().is_ok());
    }
}
