//! DVC command-line client
//!
//! Commands:
//! - attest: run a zkTLS attestation and save the attestation data
//! - program: upload and list proving service programs
//! - task: submit and manage proving tasks

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod attest;
mod service;

use attest::AttestTarget;
use service::{ProgramCommand, TaskCommand};

#[derive(Parser)]
#[command(name = "dvc")]
#[command(about = "zkTLS attestation and verifiable computation client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attest an exchange API response through the attestation network
    Attest {
        #[command(subcommand)]
        target: AttestTarget,
    },

    /// Manage programs on the proving service
    Program {
        #[command(subcommand)]
        command: ProgramCommand,
    },

    /// Manage proving tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dvc=info,dvc_zktls_client=info,dvc_exchange_builders=info,dvc_prover_client=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Attest { target } => attest::run(target).await?,
        Commands::Program { command } => service::run_program(command).await?,
        Commands::Task { command } => service::run_task(command).await?,
    }

    Ok(())
}
