//! NFT deploy scripts
//!
//! Deploys the BasicNft and NftMarketplace contracts, optionally verifying
//! their source on a block explorer, and runs the mint-and-list interaction.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod artifacts;
mod config;
mod deploy;
mod eth;
mod mint_and_list;
mod wallet;

use artifacts::ArtifactStore;
use config::{etherscan_api_key, load_config, Config, NetworkContext, DEFAULT_CONFIG_PATH};
use deploy::run_deploy_scripts;
use eth::{Chain, EtherscanVerifier, EthChain, SourceVerifier};
use mint_and_list::MintAndList;
use wallet::{format_eth, load_wallet};

/// NFT deploy scripts
#[derive(Parser)]
#[command(name = "nft-deploy-scripts")]
#[command(about = "Deploy, verify, mint and list NFT contracts")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Target network (defaults to the configured default network)
    #[arg(short, long)]
    network: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the deploy scripts
    Deploy {
        /// Only run scripts carrying one of these tags
        #[arg(long, value_delimiter = ',', default_value = "all")]
        tags: Vec<String>,
    },

    /// Deploy a marketplace and an NFT, mint a token and list it
    MintAndList,

    /// Validate configuration and print the resolved network
    CheckConfig,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!(error = ?e, "Task failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(Some(&cli.config)).context("Failed to load configuration")?;
    let network_name = cli
        .network
        .clone()
        .unwrap_or_else(|| config.default_network.clone());
    let network = config
        .network(&network_name)
        .context("Failed to resolve network")?;

    match cli.command {
        Commands::CheckConfig => cmd_check_config(&config, &network),
        Commands::Deploy { tags } => cmd_deploy(&config, &network, &tags).await,
        Commands::MintAndList => cmd_mint_and_list(&config, &network).await,
    }
}

fn cmd_check_config(config: &Config, network: &NetworkContext) -> Result<()> {
    println!("Configuration is valid");
    println!("\nNetwork: {}", network.name);
    println!("  RPC URL:        {}", network.rpc_url);
    println!("  Chain ID:       {}", network.chain_id);
    println!("  Confirmations:  {}", network.confirmations());
    println!("  Development:    {}", network.is_development);
    println!(
        "  Verification:   {}",
        if deploy::should_verify(network, etherscan_api_key().as_deref()) {
            "enabled"
        } else {
            "skipped"
        }
    );
    println!("\nArtifacts: {}", config.paths.artifacts.display());
    println!("Deployer key: {}", config.accounts.private_key_file.display());

    Ok(())
}

async fn connect(config: &Config, network: &NetworkContext) -> Result<EthChain> {
    let wallet = load_wallet(&config.accounts.private_key_file)?;
    let chain = EthChain::new(network, wallet).context("Failed to connect to network")?;

    match chain.balance().await {
        Ok(balance) => info!(
            network = %network.name,
            deployer = ?chain.sender(),
            balance = %format_eth(balance),
            "Connected"
        ),
        Err(e) => warn!(network = %network.name, error = %e, "Could not fetch deployer balance"),
    }

    Ok(chain)
}

async fn cmd_deploy(config: &Config, network: &NetworkContext, tags: &[String]) -> Result<()> {
    let chain = connect(config, network).await?;
    let artifacts = ArtifactStore::new(&config.paths.artifacts);
    let api_key = etherscan_api_key();

    let verifier = match api_key.as_ref() {
        Some(key) if !network.is_development => Some(
            EtherscanVerifier::for_network(network, key.clone(), artifacts.clone())
                .context("Failed to set up block-explorer verification")?,
        ),
        _ => None,
    };

    let records = run_deploy_scripts(
        &chain,
        verifier.as_ref().map(|v| v as &dyn SourceVerifier),
        network,
        &artifacts,
        tags,
        api_key.as_deref(),
    )
    .await?;

    for record in &records {
        println!("{}: {:?}", record.contract_name, record.address);
    }

    Ok(())
}

async fn cmd_mint_and_list(config: &Config, network: &NetworkContext) -> Result<()> {
    let chain = connect(config, network).await?;
    let artifacts = ArtifactStore::new(&config.paths.artifacts);

    let outcome = MintAndList::from_artifacts(&chain, &artifacts)?
        .run()
        .await
        .inspect_err(|e| {
            if let Some(stage) = e.stage() {
                error!(stage = %stage, "Mint and list aborted");
            }
        })?;

    println!("Listed token {} of {:?}", outcome.token_id, outcome.token);
    println!("  Marketplace: {:?}", outcome.marketplace);
    println!("  Seller:      {:?}", outcome.seller);
    println!("  Price:       {}", format_eth(outcome.price));

    Ok(())
}
