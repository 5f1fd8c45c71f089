//! OKX public instruments request

use anyhow::Result;
use dvc_common::{RequestDescriptor, RequestParams, ResolveOp, ResponseResolveRule};

use crate::RequestParamsSource;

pub const OKX_INSTRUMENTS_URL: &str = "https://www.okx.com/api/v5/public/instruments";

/// What gets attested about the instruments response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OkxRule {
    /// SHA-256 over the whole response
    #[default]
    ResponseHash,
    /// Grumpkin commitment to the first instrument's base currency
    GrumpkinCommitment,
}

impl OkxRule {
    fn resolve_rule(self) -> ResponseResolveRule {
        match self {
            OkxRule::ResponseHash => {
                ResponseResolveRule::json("hash-of-response", "$", ResolveOp::Sha256Ex)
            }
            OkxRule::GrumpkinCommitment => ResponseResolveRule::json(
                "grumpkin-commitment",
                "$.data[0].baseCcy",
                ResolveOp::RevealGrumpkinCommitment,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkxInstrumentsRequest {
    pub inst_type: String,
    pub inst_id: String,
    pub rule: OkxRule,
}

impl Default for OkxInstrumentsRequest {
    fn default() -> Self {
        Self {
            inst_type: "SPOT".to_string(),
            inst_id: "BTC-USD".to_string(),
            rule: OkxRule::ResponseHash,
        }
    }
}

impl OkxInstrumentsRequest {
    pub fn new(inst_id: impl Into<String>, rule: OkxRule) -> Self {
        Self {
            inst_id: inst_id.into(),
            rule,
            ..Default::default()
        }
    }

    pub fn url(&self) -> String {
        format!(
            "{}?instType={}&instId={}",
            OKX_INSTRUMENTS_URL, self.inst_type, self.inst_id
        )
    }
}

impl RequestParamsSource for OkxInstrumentsRequest {
    fn request_params(&self) -> Result<RequestParams> {
        Ok(RequestParams::single(
            RequestDescriptor::get(self.url()),
            vec![self.rule.resolve_rule()],
        ))
    }
}
