//! Block-explorer source verification.
//!
//! Talks to the Etherscan-compatible `contract` API: submit the standard-JSON
//! compiler input, then poll the returned GUID until the explorer accepts or
//! rejects it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::config::NetworkContext;

use super::chain::DeploymentRecord;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Explorer rejected submission: {0}")]
    Rejected(String),

    #[error("Verification failed: {0}")]
    Failed(String),

    #[error("Verification still pending after {0} checks")]
    Timeout(u32),

    #[error("No block-explorer API known for network {0}")]
    UnsupportedNetwork(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    AlreadyVerified,
}

/// Registers deployed contract source with a block explorer.
#[async_trait]
pub trait SourceVerifier: Send + Sync {
    async fn verify(&self, record: &DeploymentRecord) -> Result<VerificationOutcome, VerifyError>;
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    message: String,
    result: String,
}

fn is_already_verified(text: &str) -> bool {
    text.to_lowercase().contains("already verified")
}

/// Etherscan API endpoint for well-known networks.
pub fn default_api_url(network: &str) -> Option<&'static str> {
    match network {
        "mainnet" => Some("https://api.etherscan.io/api"),
        "goerli" => Some("https://api-goerli.etherscan.io/api"),
        "sepolia" => Some("https://api-sepolia.etherscan.io/api"),
        "polygon" => Some("https://api.polygonscan.com/api"),
        "arbitrum" => Some("https://api.arbiscan.io/api"),
        "optimism" => Some("https://api-optimistic.etherscan.io/api"),
        _ => None,
    }
}

/// Constructor arguments as the explorer expects them: ABI-encoded hex, no prefix.
pub fn encode_constructor_args(record: &DeploymentRecord) -> String {
    hex::encode(ethers::abi::encode(&record.constructor_args))
}

/// Etherscan-compatible verifier.
pub struct EtherscanVerifier {
    client: Client,
    api_url: String,
    api_key: String,
    artifacts: ArtifactStore,
    poll_interval: Duration,
    max_checks: u32,
}

impl EtherscanVerifier {
    pub fn new(api_url: String, api_key: String, artifacts: ArtifactStore) -> Result<Self, VerifyError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_url,
            api_key,
            artifacts,
            poll_interval: Duration::from_secs(5),
            max_checks: 24,
        })
    }

    /// Build a verifier for `network`, using its configured API URL or the
    /// well-known one for its name.
    pub fn for_network(
        network: &NetworkContext,
        api_key: String,
        artifacts: ArtifactStore,
    ) -> Result<Self, VerifyError> {
        let api_url = network
            .etherscan_api_url
            .clone()
            .or_else(|| default_api_url(&network.name).map(str::to_string))
            .ok_or_else(|| VerifyError::UnsupportedNetwork(network.name.clone()))?;
        Self::new(api_url, api_key, artifacts)
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_checks: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_checks = max_checks;
        self
    }

    /// Submit source for verification. Returns the GUID to poll, or `None`
    /// when the contract is already verified.
    async fn submit(&self, record: &DeploymentRecord) -> Result<Option<String>, VerifyError> {
        let artifact = self.artifacts.load(&record.contract_name)?;
        let build_info = self.artifacts.build_info(&record.contract_name)?;

        let source_code = build_info.input.to_string();
        let contract_address = format!("{:?}", record.address);
        let contract_name = artifact.qualified_name();
        let compiler_version = format!("v{}", build_info.solc_long_version);
        let constructor_args = encode_constructor_args(record);

        let params = [
            ("apikey", self.api_key.as_str()),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", contract_address.as_str()),
            ("sourceCode", source_code.as_str()),
            ("codeformat", "solidity-standard-json-input"),
            ("contractname", contract_name.as_str()),
            ("compilerversion", compiler_version.as_str()),
            // Misspelling is part of the explorer API.
            ("constructorArguements", constructor_args.as_str()),
        ];

        let response: ExplorerResponse = self
            .client
            .post(&self.api_url)
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status == "1" {
            debug!(guid = %response.result, "Verification submitted");
            return Ok(Some(response.result));
        }
        if is_already_verified(&response.result) || is_already_verified(&response.message) {
            return Ok(None);
        }
        Err(VerifyError::Rejected(response.result))
    }

    /// Poll the verification status until it leaves the queue.
    async fn wait_for_result(&self, guid: &str) -> Result<VerificationOutcome, VerifyError> {
        for _ in 0..self.max_checks {
            tokio::time::sleep(self.poll_interval).await;

            let response: ExplorerResponse = self
                .client
                .get(&self.api_url)
                .query(&[
                    ("apikey", self.api_key.as_str()),
                    ("module", "contract"),
                    ("action", "checkverifystatus"),
                    ("guid", guid),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if response.result.starts_with("Pending") {
                debug!(guid = %guid, "Verification pending");
                continue;
            }
            if is_already_verified(&response.result) {
                return Ok(VerificationOutcome::AlreadyVerified);
            }
            if response.status == "1" {
                return Ok(VerificationOutcome::Verified);
            }
            return Err(VerifyError::Failed(response.result));
        }

        Err(VerifyError::Timeout(self.max_checks))
    }
}

#[async_trait]
impl SourceVerifier for EtherscanVerifier {
    async fn verify(&self, record: &DeploymentRecord) -> Result<VerificationOutcome, VerifyError> {
        let outcome = match self.submit(record).await? {
            Some(guid) => self.wait_for_result(&guid).await?,
            None => VerificationOutcome::AlreadyVerified,
        };

        match outcome {
            VerificationOutcome::Verified => {
                info!(contract = %record.contract_name, address = ?record.address, "Contract verified")
            }
            VerificationOutcome::AlreadyVerified => {
                info!(contract = %record.contract_name, address = ?record.address, "Already verified")
            }
        }

        Ok(outcome)
    }
}
