//! Configuration management for nft-deploy-scripts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "hardhat.toml";

/// Environment variable holding the block-explorer API key.
pub const ETHERSCAN_API_KEY_ENV: &str = "ETHERSCAN_API_KEY";

/// Environment variable overriding the deployer key file.
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";
const LOCAL_CHAIN_ID: u64 = 31337;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
}

/// Settings for a single target network.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,

    /// Chain ID used when signing transactions.
    pub chain_id: u64,

    /// Confirmations to wait for after deployments. Unset means 1.
    #[serde(default)]
    pub block_confirmations: Option<u64>,

    /// Block-explorer API endpoint used for source verification.
    #[serde(default)]
    pub etherscan_api_url: Option<String>,
}

impl NetworkConfig {
    fn local() -> Self {
        Self {
            rpc_url: LOCAL_RPC_URL.to_string(),
            chain_id: LOCAL_CHAIN_ID,
            block_confirmations: None,
            etherscan_api_url: None,
        }
    }
}

/// Deployer account configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Path to file containing the deployer private key (hex).
    pub private_key_file: PathBuf,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            private_key_file: PathBuf::from("deployer.key"),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding compiled contract artifacts.
    pub artifacts: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifacts: PathBuf::from("artifacts"),
        }
    }
}

/// Main configuration container.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Network used when none is given on the command line.
    pub default_network: String,

    /// Networks on which block-explorer verification is never attempted.
    pub development_chains: Vec<String>,

    pub networks: BTreeMap<String, NetworkConfig>,
    pub accounts: AccountsConfig,
    pub paths: PathsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_network: "localhost".to_string(),
            development_chains: vec!["hardhat".to_string(), "localhost".to_string()],
            networks: BTreeMap::new(),
            accounts: AccountsConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

/// Resolved, read-only view of the network a task runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    pub name: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub block_confirmations: Option<u64>,
    pub is_development: bool,
    pub etherscan_api_url: Option<String>,
}

impl NetworkContext {
    /// Confirmations to wait for: the configured count, or 1 when unset or zero.
    pub fn confirmations(&self) -> usize {
        match self.block_confirmations {
            Some(n) if n > 0 => n as usize,
            _ => 1,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, network) in &self.networks {
            if network.rpc_url.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "networks.{name}.rpc_url must not be empty"
                )));
            }
            if network.chain_id == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "networks.{name}.chain_id must not be zero"
                )));
            }
        }
        Ok(())
    }

    /// Resolve a network by name. `hardhat` and `localhost` fall back to a
    /// local node when not configured.
    pub fn network(&self, name: &str) -> Result<NetworkContext, ConfigError> {
        let network = match self.networks.get(name) {
            Some(n) => n.clone(),
            None if name == "hardhat" || name == "localhost" => NetworkConfig::local(),
            None => return Err(ConfigError::UnknownNetwork(name.to_string())),
        };

        Ok(NetworkContext {
            name: name.to_string(),
            rpc_url: network.rpc_url,
            chain_id: network.chain_id,
            block_confirmations: network.block_confirmations,
            is_development: self.development_chains.iter().any(|c| c == name),
            etherscan_api_url: network.etherscan_api_url,
        })
    }
}

/// Load configuration from the default or specified path.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));
    Config::from_file(config_path)
}

/// Block-explorer credential from the environment. Empty values count as absent.
pub fn etherscan_api_key() -> Option<String> {
    std::env::var(ETHERSCAN_API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
default_network = "sepolia"

[networks.sepolia]
rpc_url = "https://ethereum-sepolia-rpc.publicnode.com"
chain_id = 11155111
block_confirmations = 6

[networks.localhost]
rpc_url = "http://127.0.0.1:8545"
chain_id = 31337

[accounts]
private_key_file = "/tmp/deployer.key"
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_network, "localhost");
        assert_eq!(config.development_chains, vec!["hardhat", "localhost"]);
        assert_eq!(config.paths.artifacts, PathBuf::from("artifacts"));
    }

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.default_network, "sepolia");
        assert_eq!(config.networks.len(), 2);
        assert_eq!(config.accounts.private_key_file, PathBuf::from("/tmp/deployer.key"));

        let sepolia = config.network("sepolia").unwrap();
        assert_eq!(sepolia.chain_id, 11155111);
        assert!(!sepolia.is_development);
        assert_eq!(sepolia.confirmations(), 6);

        let local = config.network("localhost").unwrap();
        assert!(local.is_development);
        assert_eq!(local.confirmations(), 1);
    }

    #[test]
    fn test_confirmations_default_to_one() {
        let mut ctx = Config::default().network("hardhat").unwrap();
        assert_eq!(ctx.confirmations(), 1);
        ctx.block_confirmations = Some(0);
        assert_eq!(ctx.confirmations(), 1);
        ctx.block_confirmations = Some(3);
        assert_eq!(ctx.confirmations(), 3);
    }

    #[test]
    fn test_unknown_network() {
        let config = Config::default();
        assert!(matches!(
            config.network("mainnet"),
            Err(ConfigError::UnknownNetwork(name)) if name == "mainnet"
        ));
    }

    #[test]
    fn test_invalid_network_rejected() {
        let toml = r#"
[networks.broken]
rpc_url = ""
chain_id = 1
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_network, "localhost");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hardhat.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.network("sepolia").unwrap().confirmations(), 6);
    }
}
