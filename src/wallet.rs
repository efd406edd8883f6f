//! Deployer key handling.

use std::path::Path;

use anyhow::{Context, Result};
use ethers::prelude::*;

use crate::config::PRIVATE_KEY_ENV;

/// Read private key from file.
pub fn read_private_key(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .with_context(|| format!("Failed to read private key file {}", path.display()))
}

/// Parse a hex private key, with or without `0x` prefix.
pub fn parse_wallet(private_key: &str) -> Result<LocalWallet> {
    let key = private_key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    key.parse::<LocalWallet>().context("Invalid private key")
}

/// Load the deployer wallet: `PRIVATE_KEY` from the environment, else the key file.
pub fn load_wallet(key_file: &Path) -> Result<LocalWallet> {
    match std::env::var(PRIVATE_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => parse_wallet(&key),
        _ => parse_wallet(&read_private_key(key_file)?),
    }
}

/// Format a wei amount as ETH for display.
pub fn format_eth(wei: U256) -> String {
    match ethers::utils::format_ether(wei).parse::<f64>() {
        Ok(eth) => format!("{:.6} ETH", eth),
        Err(_) => format!("{} wei", wei),
    }
}
