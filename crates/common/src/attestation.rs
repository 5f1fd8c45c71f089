//! Values exchanged with the attestation network and the final zkVM artifact

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Address the attestation network binds a session's tasks to
pub const DEFAULT_ATTESTOR_ADDRESS: &str = "0x810b7bacEfD5ba495bB688bbFD2501C904036AB7";

/// Identity binding for the attesting party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestParams {
    pub address: String,
}

impl Default for AttestParams {
    fn default() -> Self {
        Self {
            address: DEFAULT_ATTESTOR_ADDRESS.to_string(),
        }
    }
}

/// Opaque token returned by task submission, passed through untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmitResult(pub Map<String, Value>);

/// Attestation of a single request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<Value>,
    pub task_id: String,
    #[serde(default)]
    pub report_tx_hash: String,
    /// Fields the network adds that are carried into the artifact unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AttestationRecord {
    /// True if the record carries a truthy attestation value
    pub fn has_attestation(&self) -> bool {
        self.attestation.as_ref().is_some_and(is_truthy)
    }

    pub fn task_query(&self) -> TaskQuery {
        TaskQuery {
            task_id: self.task_id.clone(),
            report_tx_hash: self.report_tx_hash.clone(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Per-request attestation records, in request order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttestResult(pub Vec<AttestationRecord>);

impl AttestResult {
    /// The first record, provided it carries an attestation
    pub fn primary(&self) -> Result<&AttestationRecord> {
        match self.0.first() {
            Some(record) if record.has_attestation() => Ok(record),
            _ => Err(Error::InvalidAttestation),
        }
    }

    pub fn records(&self) -> &[AttestationRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Key for verification and polling of an attested task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub task_id: String,
    pub report_tx_hash: String,
}

/// Outcome of verification and polling
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskResult(pub Value);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationType {
    #[serde(rename = "HASH_COMPARISON")]
    HashComparison,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateData {
    pub plain_json_response: String,
}

/// Input consumed by the zkVM program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationData {
    pub verification_type: VerificationType,
    pub public_data: AttestResult,
    pub private_data: PrivateData,
}

/// Output of one orchestration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkVmRequestData {
    pub attestation_data: AttestationData,
    #[serde(rename = "requestid")]
    pub request_id: String,
}

impl ZkVmRequestData {
    /// Assemble the artifact for a hash-comparison verification
    pub fn hash_comparison(
        attest_result: AttestResult,
        plain_json_response: String,
        request_id: String,
    ) -> Self {
        Self {
            attestation_data: AttestationData {
                verification_type: VerificationType::HashComparison,
                public_data: attest_result,
                private_data: PrivateData {
                    plain_json_response,
                },
            },
            request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(attestation: Value) -> AttestationRecord {
        serde_json::from_value(json!({
            "attestation": attestation,
            "taskId": "task-1",
            "reportTxHash": "0xabc",
            "attestor": "0x01"
        }))
        .unwrap()
    }

    #[test]
    fn test_primary_requires_truthy_attestation() {
        assert!(AttestResult(vec![record(json!({"sig": "00"}))]).primary().is_ok());

        for falsy in [json!(null), json!(""), json!(false), json!(0)] {
            let result = AttestResult(vec![record(falsy)]);
            assert!(matches!(result.primary(), Err(Error::InvalidAttestation)));
        }

        assert!(matches!(
            AttestResult::default().primary(),
            Err(Error::InvalidAttestation)
        ));
    }

    #[test]
    fn test_record_keeps_extra_fields() {
        let rec = record(json!("att"));
        assert_eq!(rec.extra.get("attestor"), Some(&json!("0x01")));
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["taskId"], "task-1");
        assert_eq!(value["reportTxHash"], "0xabc");
        assert_eq!(value["attestor"], "0x01");
    }

    #[test]
    fn test_artifact_wire_format() {
        let data = ZkVmRequestData::hash_comparison(
            AttestResult(vec![record(json!("att"))]),
            "{\"a\":1}".to_string(),
            "task-1".to_string(),
        );
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["requestid"], "task-1");
        assert_eq!(value["attestationData"]["verification_type"], "HASH_COMPARISON");
        assert_eq!(
            value["attestationData"]["private_data"]["plain_json_response"],
            "{\"a\":1}"
        );
        assert_eq!(value["attestationData"]["public_data"][0]["taskId"], "task-1");
    }
}
