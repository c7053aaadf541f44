#[macro_use]
mod utils;
mod config;
mod controlplane;
mod crd;
mod errors;
mod logging;
mod nodepool;
mod release;

use clap::{Args, Parser, Subcommand};
use kube::Client;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::OperatorConfig;
use crate::errors::Error;
use crate::nodepool::{CreateNodePoolOptions, PlatformOptions};
use crate::utils::store::KubeStore;
use crate::utils::strings::{field_manager, get_version_string};

#[derive(Parser, Debug)]
#[command(name = "hosted-cluster-controller", about = "Hosted control plane operator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the hosted control plane controller
    Operator,
    /// Print the version and exit
    Version,
    /// Manage node pools of hosted clusters
    #[command(subcommand)]
    Nodepool(NodePoolCommand),
}

#[derive(Subcommand, Debug)]
enum NodePoolCommand {
    /// Create a node pool for an existing hosted cluster
    Create(CreateNodePoolArgs),
}

#[derive(Args, Debug)]
struct CreateNodePoolArgs {
    #[command(flatten)]
    options: CreateNodePoolOptions,
    #[command(subcommand)]
    platform: PlatformOptions,
}

async fn run_operator() -> Result<(), Error> {
    let config = OperatorConfig::from_env()?;
    info!("Starting hosted control plane operator {}", get_version_string());
    let client = Client::try_default().await?;
    controlplane::run(client, config).await
}

async fn create_node_pool(args: CreateNodePoolArgs) -> Result<(), Error> {
    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            interrupt.cancel();
        }
    });

    let client = Client::try_default().await?;
    let store = KubeStore::new(client, &field_manager("nodepool"));
    let node_pool =
        nodepool::create_node_pool(token, &args.options, &args.platform, &store).await?;
    if args.options.render {
        print!("{}", nodepool::render(&node_pool)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Help and version requests are not failures
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let _provider = match logging::setup_tracing() {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Failed to set up tracing: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Version => {
            println!("{}", get_version_string());
            ExitCode::SUCCESS
        }
        Command::Operator => match run_operator().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Operator failed: {e}");
                ExitCode::FAILURE
            }
        },
        Command::Nodepool(NodePoolCommand::Create(args)) => match create_node_pool(args).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) if e.is_cancelled() => {
                warn!("Node pool creation cancelled, nothing was submitted");
                ExitCode::FAILURE
            }
            Err(e) => {
                error!("Failed to create nodepool: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
