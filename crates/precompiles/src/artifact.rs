//! Compiled contract artifacts (Hardhat JSON) behind an injectable loader.
//!
//! Artifacts are never loaded implicitly: whoever needs one receives an
//! [`ArtifactLoader`] and asks it by name. Provenance is not validated.

use alloy_primitives::Bytes;
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// ABI and creation bytecode of a compiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledContract {
    /// Contract name as reported by the compiler.
    pub name: String,
    /// JSON ABI.
    pub abi: serde_json::Value,
    /// Creation bytecode.
    pub bytecode: Bytes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: String,
    abi: serde_json::Value,
    bytecode: Bytes,
}

impl CompiledContract {
    /// Parses a Hardhat artifact.
    pub fn from_hardhat_json(json: &str) -> Result<Self, ArtifactError> {
        let artifact: HardhatArtifact = serde_json::from_str(json)?;
        if artifact.bytecode.is_empty() {
            return Err(ArtifactError::EmptyBytecode(artifact.contract_name));
        }
        if !artifact.abi.is_array() {
            return Err(ArtifactError::InvalidAbi(artifact.contract_name));
        }
        Ok(Self {
            name: artifact.contract_name,
            abi: artifact.abi,
            bytecode: artifact.bytecode,
        })
    }
}

/// Errors raised while loading artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// No artifact is known under the name.
    #[error("artifact {0:?} not found")]
    NotFound(String),
    /// The name would escape the artifact directory.
    #[error("invalid artifact name {0:?}")]
    InvalidName(String),
    /// Reading the artifact file failed.
    #[error("failed to read artifact {path}: {source}")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The file is not a Hardhat artifact.
    #[error("malformed artifact: {0}")]
    Parse(#[from] serde_json::Error),
    /// The artifact carries no bytecode.
    #[error("artifact {0:?} has empty bytecode")]
    EmptyBytecode(String),
    /// The ABI is not a JSON array.
    #[error("artifact {0:?} has a malformed ABI")]
    InvalidAbi(String),
}

/// Source of compiled contracts.
pub trait ArtifactLoader: Send + Sync {
    /// Loads the artifact registered as `name`.
    fn load(&self, name: &str) -> Result<CompiledContract, ArtifactError>;
}

/// Reads `{name}.json` Hardhat artifacts from a directory.
#[derive(Debug, Clone)]
pub struct DirArtifactLoader {
    root: PathBuf,
}

impl DirArtifactLoader {
    /// Loads artifacts from files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory artifacts are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactLoader for DirArtifactLoader {
    fn load(&self, name: &str) -> Result<CompiledContract, ArtifactError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(ArtifactError::InvalidName(name.to_string()));
        }
        let path = self.root.join(format!("{name}.json"));
        let json = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ArtifactError::NotFound(name.to_string())
            } else {
                ArtifactError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        let contract = CompiledContract::from_hardhat_json(&json)?;
        tracing::debug!(
            target: "precompiles::artifact",
            name,
            path = %path.display(),
            bytecode_len = contract.bytecode.len(),
            "loaded contract artifact"
        );
        Ok(contract)
    }
}

/// In-memory artifacts, typically embedded at build time.
#[derive(Debug, Clone, Default)]
pub struct StaticArtifactLoader {
    artifacts: HashMap<String, CompiledContract>,
}

impl StaticArtifactLoader {
    /// An empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `contract` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, contract: CompiledContract) {
        self.artifacts.insert(name.into(), contract);
    }

    /// Parses and registers a Hardhat artifact.
    pub fn with_hardhat_json(
        mut self,
        name: impl Into<String>,
        json: &str,
    ) -> Result<Self, ArtifactError> {
        let contract = CompiledContract::from_hardhat_json(json)?;
        self.insert(name, contract);
        Ok(self)
    }
}

impl ArtifactLoader for StaticArtifactLoader {
    fn load(&self, name: &str) -> Result<CompiledContract, ArtifactError> {
        self.artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound(name.to_string()))
    }
}
