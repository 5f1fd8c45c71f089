pub mod artifact;
pub mod attestation;
pub mod error;
pub mod request;

pub use attestation::{
    AttestParams, AttestResult, AttestationData, AttestationRecord, PrivateData, SubmitResult,
    TaskQuery, TaskResult, VerificationType, ZkVmRequestData, DEFAULT_ATTESTOR_ADDRESS,
};
pub use error::{Error, Result};
pub use request::{ParseType, RequestDescriptor, RequestParams, ResolveOp, ResponseResolveRule};
