//! Ethereum integration module.

mod chain;
mod contracts;
#[cfg(test)]
pub(crate) mod mock;
mod verifier;

pub use chain::{Chain, ChainError, DeploymentRecord, EthChain};
pub use contracts::{
    listing_price, minted_token_id, ApproveCall, GetListingCall, GetListingReturn, ListItemCall,
    MintNftCall, TokenIdError,
};
pub use verifier::{EtherscanVerifier, SourceVerifier, VerificationOutcome, VerifyError};
