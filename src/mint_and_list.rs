//! Deploy a marketplace and an NFT, mint one token, and list it for sale.
//!
//! The run is a strictly linear pipeline. Each transaction waits for one
//! confirmation before the next step starts; the first failure aborts the
//! remaining steps.

use std::fmt;

use ethers::abi::{AbiDecode, AbiEncode};
use ethers::types::{Address, U256};
use thiserror::Error;
use tracing::{debug, info};

use crate::artifacts::{ArtifactError, ArtifactStore, ContractArtifact};
use crate::eth::{
    listing_price, minted_token_id, ApproveCall, Chain, ChainError, GetListingCall,
    GetListingReturn, ListItemCall, MintNftCall, TokenIdError,
};

/// Confirmations awaited after every transaction in the run.
const CONFIRMATIONS: usize = 1;

pub const MARKETPLACE_CONTRACT: &str = "NftMarketplace";
pub const TOKEN_CONTRACT: &str = "BasicNft";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DeployingMarketplace,
    DeployingToken,
    Minting,
    Approving,
    Listing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::DeployingMarketplace => "deploying marketplace",
            Stage::DeployingToken => "deploying token",
            Stage::Minting => "minting",
            Stage::Approving => "approving",
            Stage::Listing => "listing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    TokenId(#[from] TokenIdError),

    #[error("Failed to decode listing: {0}")]
    Decode(String),

    #[error("Listing mismatch: expected {expected_price} from {expected_seller:?}, found {price} from {seller:?}")]
    ListingMismatch {
        expected_price: U256,
        expected_seller: Address,
        price: U256,
        seller: Address,
    },
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Aborted while {stage}: {source}")]
    Aborted {
        stage: Stage,
        #[source]
        source: StepError,
    },
}

impl RunnerError {
    /// Stage the run stopped in, if it got as far as the chain.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RunnerError::Aborted { stage, .. } => Some(*stage),
            RunnerError::Artifact(_) => None,
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingOutcome {
    pub marketplace: Address,
    pub token: Address,
    pub token_id: U256,
    pub price: U256,
    pub seller: Address,
}

/// Drives the mint-and-list sequence against a `Chain`.
pub struct MintAndList<'a> {
    chain: &'a dyn Chain,
    marketplace_artifact: ContractArtifact,
    token_artifact: ContractArtifact,
    stage: Stage,
}

impl<'a> MintAndList<'a> {
    pub fn new(
        chain: &'a dyn Chain,
        marketplace_artifact: ContractArtifact,
        token_artifact: ContractArtifact,
    ) -> Self {
        Self {
            chain,
            marketplace_artifact,
            token_artifact,
            stage: Stage::DeployingMarketplace,
        }
    }

    /// Resolve both contracts from compiled artifacts.
    pub fn from_artifacts(chain: &'a dyn Chain, artifacts: &ArtifactStore) -> Result<Self, RunnerError> {
        Ok(Self::new(
            chain,
            artifacts.load(MARKETPLACE_CONTRACT)?,
            artifacts.load(TOKEN_CONTRACT)?,
        ))
    }

    fn advance(&mut self, next: Stage) {
        debug!(from = %self.stage, to = %next, "Stage transition");
        self.stage = next;
    }

    fn abort(&self, source: impl Into<StepError>) -> RunnerError {
        RunnerError::Aborted {
            stage: self.stage,
            source: source.into(),
        }
    }

    /// Run every step in order.
    pub async fn run(mut self) -> Result<ListingOutcome, RunnerError> {
        let marketplace = self
            .chain
            .deploy(&self.marketplace_artifact, &[], CONFIRMATIONS)
            .await
            .map_err(|e| self.abort(e))?
            .address;
        info!(address = ?marketplace, "NftMarketplace deployed");

        self.advance(Stage::DeployingToken);
        let token = self
            .chain
            .deploy(&self.token_artifact, &[], CONFIRMATIONS)
            .await
            .map_err(|e| self.abort(e))?
            .address;
        info!(address = ?token, "BasicNft deployed");

        self.advance(Stage::Minting);
        info!("Minting...");
        let mint_receipt = self
            .chain
            .send(token, MintNftCall.encode().into(), CONFIRMATIONS)
            .await
            .map_err(|e| self.abort(e))?;
        debug!(logs = ?mint_receipt.logs, "Mint receipt");
        let token_id = minted_token_id(&mint_receipt).map_err(|e| self.abort(e))?;
        info!(token_id = %token_id, "Minted");

        self.advance(Stage::Approving);
        info!("Approving NFT...");
        let approve = ApproveCall {
            to: marketplace,
            token_id,
        };
        self.chain
            .send(token, approve.encode().into(), CONFIRMATIONS)
            .await
            .map_err(|e| self.abort(e))?;

        self.advance(Stage::Listing);
        info!("Listing NFT...");
        let price = listing_price();
        let list = ListItemCall {
            nft_address: token,
            token_id,
            price,
        };
        self.chain
            .send(marketplace, list.encode().into(), CONFIRMATIONS)
            .await
            .map_err(|e| self.abort(e))?;

        let listing = self
            .read_listing(marketplace, token, token_id)
            .await
            .map_err(|e| self.abort(e))?;
        let seller = self.chain.sender();
        if listing.price != price || listing.seller != seller {
            return Err(self.abort(StepError::ListingMismatch {
                expected_price: price,
                expected_seller: seller,
                price: listing.price,
                seller: listing.seller,
            }));
        }

        self.advance(Stage::Done);
        info!(
            marketplace = ?marketplace,
            token = ?token,
            token_id = %token_id,
            price = %price,
            seller = ?seller,
            "Listed"
        );

        Ok(ListingOutcome {
            marketplace,
            token,
            token_id,
            price: listing.price,
            seller: listing.seller,
        })
    }

    async fn read_listing(
        &self,
        marketplace: Address,
        token: Address,
        token_id: U256,
    ) -> Result<GetListingReturn, StepError> {
        let query = GetListingCall {
            nft_address: token,
            token_id,
        };
        let raw = self.chain.call(marketplace, query.encode().into()).await?;
        GetListingReturn::decode(raw.as_ref()).map_err(|e| StepError::Decode(e.to_string()))
    }
}
