//! In-memory `Chain` that simulates BasicNft and NftMarketplace.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::abi::{AbiDecode, AbiEncode, Token};
use ethers::prelude::*;

use super::chain::{Chain, ChainError, DeploymentRecord};
use super::contracts::tests::transfer_log;
use super::contracts::{BasicNftCalls, GetListingReturn, NftMarketplaceCalls};
use crate::artifacts::ContractArtifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Token,
    Marketplace,
}

/// What the mock saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Deploy {
        contract: String,
        args: Vec<Token>,
        confirmations: usize,
    },
    Send {
        to: Address,
        call: String,
        confirmations: usize,
    },
}

#[derive(Default)]
struct State {
    contracts: HashMap<Address, Kind>,
    next_address: u64,
    token_counter: HashMap<Address, U256>,
    owners: HashMap<(Address, U256), Address>,
    approvals: HashMap<(Address, U256), Address>,
    listings: HashMap<(Address, U256), (U256, Address)>,
    recorded: Vec<Recorded>,
}

pub struct MockChain {
    sender: Address,
    state: Mutex<State>,
    /// Fail the n-th operation (0-based, deploys and sends counted together).
    pub fail_at: Option<usize>,
    /// Mints emit no Transfer event.
    pub silent_mint: bool,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            sender: Address::from_low_u64_be(0xd3),
            state: Mutex::new(State {
                next_address: 0x1000,
                ..Default::default()
            }),
            fail_at: None,
            silent_mint: false,
        }
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().recorded.clone()
    }

    pub fn listing(&self, token: Address, token_id: U256) -> Option<(U256, Address)> {
        self.state.lock().unwrap().listings.get(&(token, token_id)).copied()
    }

    fn check_failure(&self, state: &State) -> Result<(), ChainError> {
        if self.fail_at == Some(state.recorded.len()) {
            return Err(ChainError::Submission("injected failure".to_string()));
        }
        Ok(())
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

fn tx_hash(n: usize) -> H256 {
    H256::from_low_u64_be(n as u64 + 1)
}

fn receipt(hash: H256, logs: Vec<Log>) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        status: Some(1.into()),
        logs,
        ..Default::default()
    }
}

#[async_trait]
impl Chain for MockChain {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn deploy(
        &self,
        artifact: &ContractArtifact,
        constructor_args: &[Token],
        confirmations: usize,
    ) -> Result<DeploymentRecord, ChainError> {
        let mut state = self.state.lock().unwrap();
        self.check_failure(&state)?;

        let kind = match artifact.contract_name.as_str() {
            "BasicNft" => Kind::Token,
            "NftMarketplace" => Kind::Marketplace,
            other => {
                return Err(ChainError::Deployment {
                    contract: other.to_string(),
                    reason: "unknown contract".to_string(),
                })
            }
        };

        let address = Address::from_low_u64_be(state.next_address);
        state.next_address += 1;
        state.contracts.insert(address, kind);

        let hash = tx_hash(state.recorded.len());
        state.recorded.push(Recorded::Deploy {
            contract: artifact.contract_name.clone(),
            args: constructor_args.to_vec(),
            confirmations,
        });

        Ok(DeploymentRecord {
            contract_name: artifact.contract_name.clone(),
            address,
            constructor_args: constructor_args.to_vec(),
            transaction_hash: hash,
        })
    }

    async fn send(
        &self,
        to: Address,
        calldata: Bytes,
        confirmations: usize,
    ) -> Result<TransactionReceipt, ChainError> {
        let mut state = self.state.lock().unwrap();
        self.check_failure(&state)?;

        let hash = tx_hash(state.recorded.len());
        let revert = || ChainError::Reverted(hash);
        let kind = *state.contracts.get(&to).ok_or_else(revert)?;
        let sender = self.sender;

        let (name, logs) = match kind {
            Kind::Token => match BasicNftCalls::decode(calldata.as_ref()).map_err(|_| revert())? {
                BasicNftCalls::MintNft(_) => {
                    let counter = state.token_counter.entry(to).or_default();
                    let token_id = *counter;
                    *counter = token_id + 1;
                    state.owners.insert((to, token_id), sender);
                    let logs = if self.silent_mint {
                        Vec::new()
                    } else {
                        vec![transfer_log(to, sender, token_id)]
                    };
                    ("mintNft", logs)
                }
                BasicNftCalls::Approve(call) => {
                    if state.owners.get(&(to, call.token_id)) != Some(&sender) {
                        return Err(revert());
                    }
                    state.approvals.insert((to, call.token_id), call.to);
                    ("approve", Vec::new())
                }
                _ => return Err(revert()),
            },
            Kind::Marketplace => {
                match NftMarketplaceCalls::decode(calldata.as_ref()).map_err(|_| revert())? {
                    NftMarketplaceCalls::ListItem(call) => {
                        let key = (call.nft_address, call.token_id);
                        if call.price.is_zero()
                            || state.owners.get(&key) != Some(&sender)
                            || state.approvals.get(&key) != Some(&to)
                            || state.listings.contains_key(&key)
                        {
                            return Err(revert());
                        }
                        state.listings.insert(key, (call.price, sender));
                        ("listItem", Vec::new())
                    }
                    _ => return Err(revert()),
                }
            }
        };

        state.recorded.push(Recorded::Send {
            to,
            call: name.to_string(),
            confirmations,
        });

        Ok(receipt(hash, logs))
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ChainError> {
        let state = self.state.lock().unwrap();
        let call_error = |reason: &str| ChainError::Call {
            to,
            reason: reason.to_string(),
        };

        if state.contracts.get(&to) != Some(&Kind::Marketplace) {
            return Err(call_error("not a marketplace"));
        }

        match NftMarketplaceCalls::decode(calldata.as_ref()).map_err(|e| call_error(&e.to_string()))? {
            NftMarketplaceCalls::GetListing(call) => {
                let (price, seller) = state
                    .listings
                    .get(&(call.nft_address, call.token_id))
                    .copied()
                    .unwrap_or_default();
                Ok(GetListingReturn { price, seller }.encode().into())
            }
            _ => Err(call_error("unsupported call")),
        }
    }
}
