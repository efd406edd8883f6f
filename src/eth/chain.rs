//! Signing access to the target network.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::artifacts::ContractArtifact;
use crate::config::NetworkContext;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Deployment of {contract} failed: {reason}")]
    Deployment { contract: String, reason: String },

    #[error("Transaction submission failed: {0}")]
    Submission(String),

    #[error("No receipt for transaction {0:?}")]
    MissingReceipt(H256),

    #[error("Transaction {0:?} reverted")]
    Reverted(H256),

    #[error("Call to {to:?} failed: {reason}")]
    Call { to: Address, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A deployed contract instance.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub address: Address,
    pub constructor_args: Vec<Token>,
    pub transaction_hash: H256,
}

/// Operations the deploy and mint-and-list tasks need from a network.
#[async_trait]
pub trait Chain: Send + Sync {
    /// Account that signs every transaction.
    fn sender(&self) -> Address;

    /// Publish a contract and wait for `confirmations` blocks.
    async fn deploy(
        &self,
        artifact: &ContractArtifact,
        constructor_args: &[Token],
        confirmations: usize,
    ) -> Result<DeploymentRecord, ChainError>;

    /// Send a transaction and wait for `confirmations` blocks. Reverted
    /// transactions are errors.
    async fn send(
        &self,
        to: Address,
        calldata: Bytes,
        confirmations: usize,
    ) -> Result<TransactionReceipt, ChainError>;

    /// Read-only call against the latest block.
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ChainError>;
}

type Client = SignerMiddleware<Provider<Http>, LocalWallet>;

/// `Chain` backed by a JSON-RPC node and a local signing key.
pub struct EthChain {
    client: Arc<Client>,
}

impl EthChain {
    /// Connect to the network's RPC endpoint and sign with `wallet`.
    pub fn new(network: &NetworkContext, wallet: LocalWallet) -> Result<Self, ChainError> {
        let provider = Provider::<Http>::try_from(network.rpc_url.as_str())
            .map_err(|e| ChainError::Config(format!("Invalid RPC URL: {}", e)))?;
        let wallet = wallet.with_chain_id(network.chain_id);
        let client = SignerMiddleware::new(provider, wallet);

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Balance of the signing account.
    pub async fn balance(&self) -> Result<U256, ChainError> {
        Ok(self
            .client
            .provider()
            .get_balance(self.sender(), None)
            .await?)
    }
}

fn ensure_success(receipt: &TransactionReceipt) -> Result<(), ChainError> {
    if receipt.status == Some(1.into()) {
        Ok(())
    } else {
        Err(ChainError::Reverted(receipt.transaction_hash))
    }
}

#[async_trait]
impl Chain for EthChain {
    fn sender(&self) -> Address {
        self.client.address()
    }

    async fn deploy(
        &self,
        artifact: &ContractArtifact,
        constructor_args: &[Token],
        confirmations: usize,
    ) -> Result<DeploymentRecord, ChainError> {
        let deployment_error = |reason: String| ChainError::Deployment {
            contract: artifact.contract_name.clone(),
            reason,
        };

        let factory = ContractFactory::new(
            artifact.abi.clone(),
            artifact.bytecode.clone(),
            self.client.clone(),
        );

        info!(
            contract = %artifact.contract_name,
            confirmations = confirmations,
            "Deploying contract"
        );

        let (contract, receipt) = factory
            .deploy_tokens(constructor_args.to_vec())
            .map_err(|e| deployment_error(e.to_string()))?
            .confirmations(confirmations)
            .send_with_receipt()
            .await
            .map_err(|e| deployment_error(e.to_string()))?;

        ensure_success(&receipt)?;

        info!(
            contract = %artifact.contract_name,
            address = ?contract.address(),
            tx_hash = ?receipt.transaction_hash,
            gas_used = ?receipt.gas_used,
            "Contract deployed"
        );

        Ok(DeploymentRecord {
            contract_name: artifact.contract_name.clone(),
            address: contract.address(),
            constructor_args: constructor_args.to_vec(),
            transaction_hash: receipt.transaction_hash,
        })
    }

    async fn send(
        &self,
        to: Address,
        calldata: Bytes,
        confirmations: usize,
    ) -> Result<TransactionReceipt, ChainError> {
        let tx = TransactionRequest::new().to(to).data(calldata);

        let pending_tx = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| ChainError::Submission(e.to_string()))?;
        let tx_hash = pending_tx.tx_hash();

        info!(tx_hash = ?tx_hash, to = ?to, "Submitted transaction");

        let receipt = pending_tx
            .confirmations(confirmations)
            .await?
            .ok_or(ChainError::MissingReceipt(tx_hash))?;

        if let Err(e) = ensure_success(&receipt) {
            error!(tx_hash = ?tx_hash, "Transaction failed");
            return Err(e);
        }

        debug!(
            tx_hash = ?tx_hash,
            block = ?receipt.block_number,
            logs = receipt.logs.len(),
            "Transaction confirmed"
        );

        Ok(receipt)
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ChainError> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(calldata).into();
        self.client
            .call(&tx, None)
            .await
            .map_err(|e| ChainError::Call {
                to,
                reason: e.to_string(),
            })
    }
}
