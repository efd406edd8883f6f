//! Contract deployment with optional block-explorer verification.

use ethers::abi::Token;
use thiserror::Error;
use tracing::{info, warn};

use crate::artifacts::{ArtifactError, ArtifactStore, ContractArtifact};
use crate::config::NetworkContext;
use crate::eth::{Chain, ChainError, DeploymentRecord, SourceVerifier, VerifyError};

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Verification error: {0}")]
    Verify(#[from] VerifyError),

    #[error("No deploy script matches tags {0:?}")]
    NoMatchingScripts(Vec<String>),
}

/// A named deployment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployScript {
    pub id: &'static str,
    pub contract: &'static str,
    pub tags: &'static [&'static str],
}

impl DeployScript {
    fn matches(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.tags.contains(&t.as_str()))
    }

    /// Constructor arguments. Both contracts take none.
    pub fn constructor_args(&self) -> Vec<Token> {
        Vec::new()
    }
}

/// Deploy scripts in execution order.
pub const DEPLOY_SCRIPTS: &[DeployScript] = &[
    DeployScript {
        id: "01-deploy-nft-marketplace",
        contract: "NftMarketplace",
        tags: &["all", "nftMarketplace"],
    },
    DeployScript {
        id: "02-deploy-basic-nft",
        contract: "BasicNft",
        tags: &["all", "basicNft"],
    },
];

/// Scripts carrying any of `tags`, in execution order.
pub fn select_scripts(tags: &[String]) -> Result<Vec<DeployScript>, DeployError> {
    let selected: Vec<DeployScript> = DEPLOY_SCRIPTS
        .iter()
        .filter(|s| s.matches(tags))
        .copied()
        .collect();

    if selected.is_empty() {
        return Err(DeployError::NoMatchingScripts(tags.to_vec()));
    }
    Ok(selected)
}

/// Whether a deployment on `network` should be registered with the block
/// explorer. Development networks never are; otherwise a credential is required.
pub fn should_verify(network: &NetworkContext, api_key: Option<&str>) -> bool {
    if network.is_development {
        return false;
    }
    matches!(api_key, Some(key) if !key.trim().is_empty())
}

/// Deploy `artifact`, wait for the network's confirmation count, and verify
/// it when [`should_verify`] allows. `verifier` is `None` when no credential
/// is available.
pub async fn deploy_contract(
    chain: &dyn Chain,
    verifier: Option<&dyn SourceVerifier>,
    network: &NetworkContext,
    artifact: &ContractArtifact,
    args: Vec<Token>,
    api_key: Option<&str>,
) -> Result<DeploymentRecord, DeployError> {
    let record = chain
        .deploy(artifact, &args, network.confirmations())
        .await?;

    info!(
        contract = %record.contract_name,
        address = ?record.address,
        tx_hash = ?record.transaction_hash,
        network = %network.name,
        "Deployed"
    );

    if should_verify(network, api_key) {
        match verifier {
            Some(verifier) => {
                info!(contract = %record.contract_name, "Verifying...");
                verifier.verify(&record).await?;
            }
            None => warn!(
                contract = %record.contract_name,
                "Verification credential present but no verifier configured"
            ),
        }
    }

    Ok(record)
}

/// Run every deploy script matching `tags` against `network`.
pub async fn run_deploy_scripts(
    chain: &dyn Chain,
    verifier: Option<&dyn SourceVerifier>,
    network: &NetworkContext,
    artifacts: &ArtifactStore,
    tags: &[String],
    api_key: Option<&str>,
) -> Result<Vec<DeploymentRecord>, DeployError> {
    let scripts = select_scripts(tags)?;
    let mut records = Vec::with_capacity(scripts.len());

    for script in scripts {
        info!(script = script.id, "__________________");
        let artifact = artifacts.load(script.contract)?;
        let record = deploy_contract(
            chain,
            verifier,
            network,
            &artifact,
            script.constructor_args(),
            api_key,
        )
        .await?;
        records.push(record);
    }

    Ok(records)
}
