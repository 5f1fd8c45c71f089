//! Client for the DVC proving service

use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::models::{
    DeletedTask, PausedTask, ProgramMetadata, ProgramRecord, SubmitTaskOptions, SubmittedTask,
    TaskRecord, TaskStatus, UploadedProgram,
};

pub const DVC_SERVICE_URL_VAR: &str = "DVC_SERVICE_URL";

/// Default timeout for every service call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for uploading programs and managing proving tasks
pub struct ProverClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TaskIdBody<'a> {
    task_id: &'a str,
}

impl ProverClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Create a client for the service at `DVC_SERVICE_URL`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_service_url(env::var(DVC_SERVICE_URL_VAR).ok())
    }

    /// Create a client from an optional service URL, failing if it is unset or empty
    pub fn from_service_url(base_url: Option<String>) -> Result<Self> {
        match base_url {
            Some(url) if !url.is_empty() => Self::new(url, DEFAULT_TIMEOUT),
            _ => anyhow::bail!("Please set {} in the environment or .env", DVC_SERVICE_URL_VAR),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Upload a compiled program binary
    pub async fn upload_program(
        &self,
        path: impl AsRef<Path>,
        metadata: &ProgramMetadata,
    ) -> Result<UploadedProgram> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read program {}", path.display()))?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "program".to_string());

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("prover", metadata.prover.to_string())
            .text("name", metadata.name.clone())
            .text("version", metadata.version.clone())
            .text("desc", metadata.desc.clone());

        let url = self.url("uploadProgram");
        debug!("Uploading program {} to {}", path.display(), url);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("uploadProgram request failed")?;

        parse_response("uploadProgram", response).await
    }

    /// All uploaded programs, ordered by id
    pub async fn list_programs(&self) -> Result<Vec<ProgramRecord>> {
        let url = self.url("listPrograms");
        debug!("Listing programs: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("listPrograms request failed")?;

        let programs: BTreeMap<String, ProgramRecord> =
            parse_response("listPrograms", response).await?;

        Ok(programs
            .into_iter()
            .map(|(program_id, record)| ProgramRecord {
                program_id,
                ..record
            })
            .collect())
    }

    /// Queue a proving task for `program_id` over an attestation artifact
    pub async fn submit_task(
        &self,
        program_id: &str,
        attestation_data: &str,
    ) -> Result<SubmittedTask> {
        self.submit_task_with(program_id, attestation_data, &SubmitTaskOptions::default())
            .await
    }

    pub async fn submit_task_with(
        &self,
        program_id: &str,
        attestation_data: &str,
        options: &SubmitTaskOptions,
    ) -> Result<SubmittedTask> {
        let mut form = Form::new()
            .text("program_id", program_id.to_string())
            .text("attestation_data", attestation_data.to_string());

        if let Some(callback) = &options.callback {
            form = form.text("callback", callback.clone());
        }

        if !options.env.is_empty() {
            let env = serde_json::to_string(&options.env).context("Failed to encode task env")?;
            form = form.text("env", env);
        }

        let url = self.url("submitTask");
        debug!("Submitting task for program {} to {}", program_id, url);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("submitTask request failed")?;

        parse_response("submitTask", response).await
    }

    /// Current state of a task
    pub async fn get_result(&self, task_id: &str) -> Result<TaskRecord> {
        let url = self.url("getResult");
        debug!("Fetching result of task {}", task_id);

        let response = self
            .client
            .get(&url)
            .query(&[("task_id", task_id)])
            .send()
            .await
            .context("getResult request failed")?;

        let record: TaskRecord = parse_response("getResult", response).await?;

        Ok(TaskRecord {
            task_id: task_id.to_string(),
            ..record
        })
    }

    /// Tasks known to the service, optionally only those in `status`
    pub async fn list_tasks(&self, status: Option<TaskStatus>) -> Result<Vec<TaskRecord>> {
        let url = self.url("listTasks");
        debug!("Listing tasks (status: {:?})", status);

        let mut request = self.client.get(&url);
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }

        let response = request.send().await.context("listTasks request failed")?;

        let tasks: BTreeMap<String, TaskRecord> = parse_response("listTasks", response).await?;

        Ok(tasks
            .into_iter()
            .map(|(task_id, record)| TaskRecord { task_id, ..record })
            .collect())
    }

    /// Remove a task, stopping it if it is running. Returns the deleted id.
    pub async fn delete_task(&self, task_id: &str) -> Result<String> {
        let url = self.url("deleteTask");
        debug!("Deleting task {}", task_id);

        let response = self
            .client
            .delete(&url)
            .query(&[("task_id", task_id)])
            .json(&TaskIdBody { task_id })
            .send()
            .await
            .context("deleteTask request failed")?;

        let deleted: DeletedTask = parse_response("deleteTask", response).await?;
        Ok(deleted.deleted)
    }

    /// Hold a queued task. Returns the paused id.
    pub async fn pause_task(&self, task_id: &str) -> Result<String> {
        let url = self.url("pauseTask");
        debug!("Pausing task {}", task_id);

        let response = self
            .client
            .post(&url)
            .query(&[("task_id", task_id)])
            .send()
            .await
            .context("pauseTask request failed")?;

        let paused: PausedTask = parse_response("pauseTask", response).await?;
        Ok(paused.paused)
    }
}

async fn parse_response<T: DeserializeOwned>(
    operation: &str,
    response: reqwest::Response,
) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        anyhow::bail!("{} failed: {}: {}", operation, status, error_text);
    }

    response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", operation))
}
