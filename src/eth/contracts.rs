//! Contract bindings for BasicNft and NftMarketplace.

use ethers::contract::parse_log;
use ethers::prelude::*;
use thiserror::Error;

abigen!(
    BasicNft,
    r#"[
        function mintNft() external returns (uint256)
        function approve(address to, uint256 tokenId) external
        function ownerOf(uint256 tokenId) external view returns (address)
        function getApproved(uint256 tokenId) external view returns (address)
        function getTokenCounter() external view returns (uint256)
        function tokenURI(uint256 tokenId) external view returns (string)
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId)
        event Approval(address indexed owner, address indexed approved, uint256 indexed tokenId)
    ]"#
);

abigen!(
    NftMarketplace,
    r#"[
        function listItem(address nftAddress, uint256 tokenId, uint256 price) external
        function buyItem(address nftAddress, uint256 tokenId) external payable
        function cancelListing(address nftAddress, uint256 tokenId) external
        function updateListing(address nftAddress, uint256 tokenId, uint256 newPrice) external
        function withdrawProceeds() external
        function getListing(address nftAddress, uint256 tokenId) external view returns (uint256 price, address seller)
        function getProceeds(address seller) external view returns (uint256)
        event ItemListed(address indexed seller, address indexed nftAddress, uint256 indexed tokenId, uint256 price)
        event ItemBought(address indexed buyer, address indexed nftAddress, uint256 indexed tokenId, uint256 price)
        event ItemCanceled(address indexed seller, address indexed nftAddress, uint256 indexed tokenId)
    ]"#
);

/// Asking price for listed tokens: 0.1 ether in wei.
pub const LISTING_PRICE_WEI: u128 = 100_000_000_000_000_000;

pub fn listing_price() -> U256 {
    U256::from(LISTING_PRICE_WEI)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenIdError {
    #[error("Mint transaction emitted no events")]
    NoEvents,

    #[error("First mint event does not carry a token id: {0}")]
    NotATransfer(String),
}

/// Token id assigned by a confirmed mint, taken from the first emitted event.
pub fn minted_token_id(receipt: &TransactionReceipt) -> Result<U256, TokenIdError> {
    let first = receipt.logs.first().ok_or(TokenIdError::NoEvents)?;
    let transfer: basic_nft::TransferFilter =
        parse_log(first.clone()).map_err(|e| TokenIdError::NotATransfer(e.to_string()))?;
    Ok(transfer.token_id)
}
