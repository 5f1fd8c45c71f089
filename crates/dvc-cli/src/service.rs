//! `dvc program` and `dvc task` commands against the proving service

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use dvc_common::artifact;
use dvc_prover_client::{ProgramMetadata, ProverClient, ProverKind, SubmitTaskOptions, TaskStatus};
use serde::Serialize;
use tracing::info;

#[derive(Subcommand)]
pub enum ProgramCommand {
    /// Upload a compiled program binary
    Upload {
        /// Path to the program ELF
        path: PathBuf,

        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, default_value = "")]
        version: String,

        #[arg(long, default_value = "")]
        desc: String,

        /// Proving backend
        #[arg(long, default_value = "succinct")]
        prover: String,
    },

    /// List uploaded programs
    List,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Submit a saved attestation to a program
    Submit {
        program_id: String,

        /// Attestation data file written by `dvc attest`
        attestation: PathBuf,

        /// URL to notify when the task finishes
        #[arg(long)]
        callback: Option<String>,

        /// Environment variable for the program run, as KEY=VALUE
        #[arg(long, value_parser = parse_env_pair)]
        env: Vec<(String, String)>,
    },

    /// Show the state and result of a task
    Result { task_id: String },

    /// List tasks
    List {
        /// Only tasks in this state (queued, running, done, error, paused)
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
    },

    /// Delete a task, stopping it if running
    Delete { task_id: String },

    /// Pause a queued task
    Pause { task_id: String },
}

fn parse_env_pair(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", value)),
    }
}

fn parse_status(value: &str) -> Result<TaskStatus, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unknown task status '{}'", value))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run_program(command: ProgramCommand) -> Result<()> {
    let client = ProverClient::from_env()?;

    match command {
        ProgramCommand::Upload {
            path,
            name,
            version,
            desc,
            prover,
        } => {
            let metadata = ProgramMetadata {
                name,
                version,
                desc,
                prover: ProverKind::from(prover),
            };

            let uploaded = client.upload_program(&path, &metadata).await?;
            info!("Program uploaded, ID: {}", uploaded.program_id);
            print_json(&uploaded)?;
        }
        ProgramCommand::List => {
            print_json(&client.list_programs().await?)?;
        }
    }

    Ok(())
}

pub async fn run_task(command: TaskCommand) -> Result<()> {
    let client = ProverClient::from_env()?;

    match command {
        TaskCommand::Submit {
            program_id,
            attestation,
            callback,
            env,
        } => {
            artifact::read_attestation(&attestation).with_context(|| {
                format!("{} is not an attestation file", attestation.display())
            })?;
            let attestation_data = artifact::load_attestation(&attestation)
                .with_context(|| format!("Failed to read {}", attestation.display()))?;

            let options = SubmitTaskOptions {
                callback,
                env: env.into_iter().collect::<BTreeMap<_, _>>(),
            };

            let task = client
                .submit_task_with(&program_id, &attestation_data, &options)
                .await?;
            info!("Task submitted: {}", task.task_id);
            print_json(&task)?;
        }
        TaskCommand::Result { task_id } => {
            let task = client.get_result(&task_id).await?;
            if task.status.is_finished() {
                info!("Task {} finished with status {}", task_id, task.status);
            } else {
                info!("Task {} is still {}", task_id, task.status);
            }
            print_json(&task)?;
        }
        TaskCommand::List { status } => {
            print_json(&client.list_tasks(status).await?)?;
        }
        TaskCommand::Delete { task_id } => {
            let deleted = client.delete_task(&task_id).await?;
            println!("deleted: {}", deleted);
        }
        TaskCommand::Pause { task_id } => {
            let paused = client.pause_task(&task_id).await?;
            println!("paused: {}", paused);
        }
    }

    Ok(())
}
