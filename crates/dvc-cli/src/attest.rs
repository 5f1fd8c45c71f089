//! `dvc attest` commands

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use dvc_common::artifact;
use dvc_exchange_builders::{
    request_params_callback, BinanceAccountRequest, OkxInstrumentsRequest, OkxRule,
    RequestParamsSource,
};
use dvc_prover_client::{ProverClient, DVC_SERVICE_URL_VAR};
use dvc_zktls_client::{
    AlgorithmType, AttestationGateway, BridgeGateway, ChainConfig, GatewayConfig, MockGateway,
    ZktlsClient, ZktlsOptions,
};
use tracing::info;

#[derive(Subcommand)]
pub enum AttestTarget {
    /// Signed Binance account snapshot, committed by response hash
    Binance {
        #[command(flatten)]
        args: AttestArgs,
    },

    /// OKX spot instrument listing, committed by response hash
    Okx {
        /// Instrument id, e.g. BTC-USD
        #[arg(long, default_value = "BTC-USD")]
        inst_id: String,

        #[command(flatten)]
        args: AttestArgs,
    },

    /// OKX spot instrument with a Grumpkin commitment to its base currency
    OkxCommitment {
        /// Instrument id, e.g. BTC-USD
        #[arg(long, default_value = "BTC-USD")]
        inst_id: String,

        #[command(flatten)]
        args: AttestArgs,
    },
}

#[derive(Args)]
pub struct AttestArgs {
    /// Where to write the attestation data
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Use the in-process mock gateway instead of the attestation bridge
    #[arg(long)]
    pub mock_gateway: bool,

    /// Submit the saved attestation to this proving service program
    #[arg(long, value_name = "PROGRAM_ID")]
    pub submit_to: Option<String>,
}

struct Plan {
    source: Arc<dyn RequestParamsSource>,
    algorithm_type: AlgorithmType,
    default_output: &'static str,
    args: AttestArgs,
}

impl AttestTarget {
    fn plan(self) -> Result<Plan> {
        let plan = match self {
            AttestTarget::Binance { args } => Plan {
                source: Arc::new(BinanceAccountRequest::from_env()?),
                algorithm_type: AlgorithmType::Mpctls,
                default_output: "binance-attestation.json",
                args,
            },
            AttestTarget::Okx { inst_id, args } => Plan {
                source: Arc::new(OkxInstrumentsRequest::new(inst_id, OkxRule::ResponseHash)),
                algorithm_type: AlgorithmType::Mpctls,
                default_output: "okx-attestation.json",
                args,
            },
            AttestTarget::OkxCommitment { inst_id, args } => Plan {
                source: Arc::new(OkxInstrumentsRequest::new(
                    inst_id,
                    OkxRule::GrumpkinCommitment,
                )),
                algorithm_type: AlgorithmType::Proxytls,
                default_output: "okx-grumpkin-commitment-attestation.json",
                args,
            },
        };

        Ok(plan)
    }
}

/// Everything an attest run talks to over the network
struct Clients {
    gateway: Arc<dyn AttestationGateway>,
    prover: Option<ProverClient>,
}

/// Build every client up front so missing bindings fail before any network call
fn connect(
    args: &AttestArgs,
    gateway_config: &GatewayConfig,
    service_url: Option<String>,
) -> Result<Clients> {
    let prover = match &args.submit_to {
        Some(_) => Some(ProverClient::from_service_url(service_url)?),
        None => None,
    };

    let gateway: Arc<dyn AttestationGateway> = if args.mock_gateway || gateway_config.mock {
        info!("Using mock attestation gateway");
        Arc::new(MockGateway::new("mock-task"))
    } else {
        info!("Using attestation bridge at {}", gateway_config.url);
        Arc::new(BridgeGateway::from_config(gateway_config))
    };

    Ok(Clients { gateway, prover })
}

pub async fn run(target: AttestTarget) -> Result<()> {
    let plan = target.plan()?;
    let output = plan
        .args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(plan.default_output));

    let params = plan
        .source
        .request_params()
        .context("Failed to build request params")?;

    let options = ZktlsOptions {
        algorithm_type: plan.algorithm_type,
        no_proxy: false,
        run_zkvm: plan.args.submit_to.is_some(),
        request_params_callback: Some(request_params_callback(plan.source.clone())),
        ..Default::default()
    };

    let clients = connect(
        &plan.args,
        &GatewayConfig::from_env()?,
        env::var(DVC_SERVICE_URL_VAR).ok(),
    )?;
    let client = ZktlsClient::new(clients.gateway, ChainConfig::from_env());

    let data = client.do_zktls(params, options).await?;

    artifact::save_attestation(&output, &data.attestation_data)
        .with_context(|| format!("Failed to save attestation to {}", output.display()))?;

    info!("Attestation saved to {}", output.display());
    println!("request id: {}", data.request_id);
    println!("attestation: {}", output.display());

    if let (Some(program_id), Some(prover)) = (plan.args.submit_to, clients.prover) {
        let attestation = artifact::load_attestation(&output)?;
        let task = prover.submit_task(&program_id, &attestation).await?;

        info!("Submitted proving task {} for program {}", task.task_id, program_id);
        println!("{}", serde_json::to_string_pretty(&task)?);
    }

    Ok(())
}
