//! Data models for the proving service API

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Proving backend a program is built for
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProverKind {
    #[default]
    Succinct,
    Other(String),
}

impl From<String> for ProverKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "succinct" => ProverKind::Succinct,
            _ => ProverKind::Other(value),
        }
    }
}

impl From<ProverKind> for String {
    fn from(value: ProverKind) -> Self {
        match value {
            ProverKind::Succinct => "succinct".to_string(),
            ProverKind::Other(other) => other,
        }
    }
}

impl fmt::Display for ProverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

/// Lifecycle state of a proving task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Done,
    Error,
    Paused,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Error => "error",
            TaskStatus::Paused => "paused",
        }
    }

    /// Whether the task will not change state any more
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive fields sent along with an uploaded program
#[derive(Debug, Clone, Default)]
pub struct ProgramMetadata {
    pub name: String,
    pub version: String,
    pub desc: String,
    pub prover: ProverKind,
}

/// Response to a program upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedProgram {
    pub program_id: String,
    pub uploaded_at: String,
}

/// A program known to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRecord {
    /// Filled in from the listing key
    #[serde(default)]
    pub program_id: String,

    pub prover: ProverKind,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub desc: String,

    #[serde(default)]
    pub uploaded_at: String,
}

/// Optional fields of a task submission
#[derive(Debug, Clone, Default)]
pub struct SubmitTaskOptions {
    /// URL the service posts the finished task to
    pub callback: Option<String>,

    /// Environment variables for the program run
    pub env: BTreeMap<String, String>,
}

/// Response to a task submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTask {
    pub task_id: String,
    pub status: TaskStatus,
}

/// A proving task as tracked by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Filled in from the request or the listing key
    #[serde(default)]
    pub task_id: String,

    pub status: TaskStatus,

    /// Program output, or the failure message when `status` is `error`
    #[serde(default)]
    pub result: Option<String>,

    /// Proof fixture JSON written by the prover
    #[serde(default)]
    pub proof_fixture: Option<String>,

    /// Proving time in seconds
    #[serde(default)]
    pub elapsed: Option<String>,

    #[serde(default)]
    pub submitted_at: Option<String>,

    #[serde(default)]
    pub prover: Option<ProverKind>,

    #[serde(default)]
    pub program_path: Option<String>,

    #[serde(default)]
    pub input_file: Option<String>,

    #[serde(default)]
    pub callback: Option<String>,

    #[serde(default)]
    pub env: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeletedTask {
    pub deleted: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PausedTask {
    pub paused: String,
}
