//! Compiled contract artifacts (ABI + creation bytecode).
//!
//! The pipeline consumes hardhat-style artifact files keyed by contract
//! name. The ABI is carried as opaque JSON; only the presence of the three
//! expected contracts is validated.

use std::collections::HashMap;
use std::path::Path;

use alloy_core::primitives::Bytes;
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{DeployError, Result};

/// Contract name of the CVT token.
pub const TOKEN_CONTRACT: &str = "CVToken";
/// Contract name of the multisig wallet.
pub const MULTISIG_CONTRACT: &str = "CVTMultisig";
/// Contract name of the vesting contract.
pub const VESTING_CONTRACT: &str = "CVTVesting";

/// The contract names every artifact set must provide.
pub const REQUIRED_CONTRACTS: &[&str] = &[TOKEN_CONTRACT, MULTISIG_CONTRACT, VESTING_CONTRACT];

/// A single compiled contract.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractArtifact {
    /// Application binary interface, not interpreted by the pipeline.
    pub abi: Value,
    /// Creation bytecode, prefixed to the ABI-encoded constructor args.
    pub bytecode: Bytes,
}

/// The artifacts for all deployable contracts, keyed by contract name.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    contracts: HashMap<String, ContractArtifact>,
}

impl ArtifactSet {
    /// Build a set from pre-loaded artifacts, validating that the three
    /// expected contract names are present.
    pub fn from_map(contracts: HashMap<String, ContractArtifact>) -> Result<Self> {
        for name in REQUIRED_CONTRACTS {
            if !contracts.contains_key(*name) {
                return Err(DeployError::MissingArtifact((*name).to_string()));
            }
        }
        Ok(Self { contracts })
    }

    /// Load `<dir>/<Name>.json` for each required contract.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut contracts = HashMap::new();

        for name in REQUIRED_CONTRACTS {
            let path = dir.join(format!("{}.json", name));
            if !path.exists() {
                return Err(DeployError::MissingArtifact((*name).to_string()));
            }
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read artifact at {}", path.display()))?;
            let artifact: ContractArtifact = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse artifact at {}", path.display()))?;
            contracts.insert((*name).to_string(), artifact);
        }

        tracing::debug!(dir = %dir.display(), "contract artifacts loaded");
        Self::from_map(contracts)
    }

    /// Look up an artifact by contract name.
    pub fn get(&self, name: &str) -> Result<&ContractArtifact> {
        self.contracts
            .get(name)
            .ok_or_else(|| DeployError::MissingArtifact(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn dummy_artifact(byte: u8) -> ContractArtifact {
        ContractArtifact {
            abi: serde_json::json!([]),
            bytecode: Bytes::from(vec![0x60, 0x80, byte]),
        }
    }

    fn full_map() -> HashMap<String, ContractArtifact> {
        REQUIRED_CONTRACTS
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), dummy_artifact(i as u8)))
            .collect()
    }

    #[test]
    fn test_from_map_complete() {
        let set = ArtifactSet::from_map(full_map()).unwrap();
        assert_eq!(set.get(TOKEN_CONTRACT).unwrap().bytecode[2], 0);
        assert_eq!(set.get(VESTING_CONTRACT).unwrap().bytecode[2], 2);
    }

    #[test]
    fn test_from_map_missing_contract() {
        let mut map = full_map();
        map.remove(MULTISIG_CONTRACT);
        let err = ArtifactSet::from_map(map).unwrap_err();
        assert!(matches!(err, DeployError::MissingArtifact(name) if name == MULTISIG_CONTRACT));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempdir::TempDir::new("cvt-artifacts").unwrap();
        for name in REQUIRED_CONTRACTS {
            let contents = serde_json::json!({
                "abi": [{"type": "constructor", "inputs": []}],
                "bytecode": "0x608060405234801561000f575f5ffd5b50",
            });
            std::fs::write(
                dir.path().join(format!("{}.json", name)),
                contents.to_string(),
            )
            .unwrap();
        }

        let set = ArtifactSet::load_from_dir(dir.path()).unwrap();
        let token = set.get(TOKEN_CONTRACT).unwrap();
        assert_eq!(token.bytecode[0], 0x60);
        assert!(token.abi.is_array());
    }

    #[test]
    fn test_load_from_dir_missing_file() {
        let dir = tempdir::TempDir::new("cvt-artifacts").unwrap();
        let err = ArtifactSet::load_from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, DeployError::MissingArtifact(name) if name == TOKEN_CONTRACT));
    }
}
