use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{Error, Result};

/// One HTTP call whose response will be attested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub header: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
}

impl RequestDescriptor {
    /// A body-less GET request with no extra headers
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            header: BTreeMap::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.insert(name.into(), value.into());
        self
    }
}

/// How the raw response is parsed before a rule is applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParseType {
    Json,
    Other(String),
}

impl From<String> for ParseType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "json" => ParseType::Json,
            _ => ParseType::Other(value),
        }
    }
}

impl From<ParseType> for String {
    fn from(value: ParseType) -> Self {
        match value {
            ParseType::Json => "json".to_string(),
            ParseType::Other(other) => other,
        }
    }
}

/// Reduction applied to the parsed value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResolveOp {
    /// Commit to the SHA-256 of the selected value
    Sha256Ex,
    /// Reveal a Grumpkin commitment of the selected value
    RevealGrumpkinCommitment,
    Other(String),
}

impl From<String> for ResolveOp {
    fn from(value: String) -> Self {
        match value.as_str() {
            "SHA256_EX" => ResolveOp::Sha256Ex,
            "REVEAL_GRUMPKIN_COMMITMENT" => ResolveOp::RevealGrumpkinCommitment,
            _ => ResolveOp::Other(value),
        }
    }
}

impl From<ResolveOp> for String {
    fn from(value: ResolveOp) -> Self {
        match value {
            ResolveOp::Sha256Ex => "SHA256_EX".to_string(),
            ResolveOp::RevealGrumpkinCommitment => "REVEAL_GRUMPKIN_COMMITMENT".to_string(),
            ResolveOp::Other(other) => other,
        }
    }
}

impl fmt::Display for ResolveOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

/// Declares how a raw HTTP response is reduced to an attested value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseResolveRule {
    pub key_name: String,
    pub parse_type: ParseType,
    /// JSONPath-like selector, `$` for the whole document
    pub parse_path: String,
    pub op: ResolveOp,
}

impl ResponseResolveRule {
    pub fn json(key_name: impl Into<String>, parse_path: impl Into<String>, op: ResolveOp) -> Self {
        Self {
            key_name: key_name.into(),
            parse_type: ParseType::Json,
            parse_path: parse_path.into(),
            op,
        }
    }
}

/// Requests paired with their response resolve rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    pub requests: Vec<RequestDescriptor>,
    pub response_resolves: Vec<Vec<ResponseResolveRule>>,
}

impl RequestParams {
    pub fn new(
        requests: Vec<RequestDescriptor>,
        response_resolves: Vec<Vec<ResponseResolveRule>>,
    ) -> Self {
        Self {
            requests,
            response_resolves,
        }
    }

    /// A single request with its rule list
    pub fn single(request: RequestDescriptor, rules: Vec<ResponseResolveRule>) -> Self {
        Self::new(vec![request], vec![rules])
    }

    /// Both sequences must be non-empty and of equal length
    pub fn validate(&self) -> Result<()> {
        if self.requests.is_empty() || self.requests.len() != self.response_resolves.len() {
            return Err(Error::InvalidInput);
        }
        Ok(())
    }
}
