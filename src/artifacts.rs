//! Compiled contract artifacts as written by the Hardhat toolchain.
//!
//! Layout:
//! - `<root>/contracts/<source>.sol/<Name>.json`: ABI and creation bytecode
//! - `<root>/contracts/<source>.sol/<Name>.dbg.json`: pointer to the build info
//! - `<root>/build-info/<hash>.json`: compiler version and standard-JSON input

use std::path::{Path, PathBuf};

use ethers::abi::Abi;
use ethers::types::Bytes;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact not found for contract {0}")]
    NotFound(String),

    #[error("Contract {0} has no bytecode (abstract contract or interface)")]
    EmptyBytecode(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A compiled contract ready for deployment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// Fully qualified name, `contracts/BasicNft.sol:BasicNft`.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

/// Compiler run that produced an artifact.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_long_version: String,
    pub input: serde_json::Value,
}

/// Lookup of artifacts by contract name.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load the artifact for `name`.
    pub fn load(&self, name: &str) -> Result<ContractArtifact, ArtifactError> {
        let path = self.artifact_path(name)?;
        let artifact: ContractArtifact = read_json(&path)?;
        if artifact.bytecode.is_empty() {
            return Err(ArtifactError::EmptyBytecode(name.to_string()));
        }
        Ok(artifact)
    }

    /// Load the build info referenced by the artifact's debug file.
    pub fn build_info(&self, name: &str) -> Result<BuildInfo, ArtifactError> {
        let artifact_path = self.artifact_path(name)?;
        let dbg_path = artifact_path.with_extension("dbg.json");
        let dbg: DebugFile = read_json(&dbg_path)?;

        let dir = dbg_path.parent().unwrap_or(&self.root);
        read_json(&dir.join(dbg.build_info))
    }

    fn artifact_path(&self, name: &str) -> Result<PathBuf, ArtifactError> {
        let file_name = format!("{name}.json");
        find_file(&self.root.join("contracts"), &file_name)
            .ok_or_else(|| ArtifactError::NotFound(name.to_string()))
    }
}

fn find_file(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if path.file_name().and_then(|n| n.to_str()) == Some(file_name) {
            return Some(path);
        }
    }

    subdirs.sort();
    subdirs.iter().find_map(|d| find_file(d, file_name))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
