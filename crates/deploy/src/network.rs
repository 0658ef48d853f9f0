//! Network registry and resolution.
//!
//! Maps a network identifier to its connection parameters. The registry is
//! static configuration data; per-network RPC overrides are applied by the
//! configuration layer via [`NetworkDescriptor::with_rpc_url`].

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DeployError, Result};

/// Connection parameters for a resolved network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    /// Registry identifier, also used to key the deployment record.
    pub name: String,
    /// JSON-RPC endpoint used to submit and confirm transactions.
    pub rpc_url: Url,
    /// EIP-155 chain ID.
    pub chain_id: u64,
}

impl NetworkDescriptor {
    /// Replace the RPC endpoint, keeping identity and chain ID.
    pub fn with_rpc_url(mut self, rpc_url: Url) -> Self {
        self.rpc_url = rpc_url;
        self
    }
}

struct NetworkEntry {
    name: &'static str,
    chain_id: u64,
    rpc_url: &'static str,
}

/// Supported deployment targets, default endpoints from `<https://publicnode.com/>`.
const NETWORKS: &[NetworkEntry] = &[
    NetworkEntry {
        name: "mainnet",
        chain_id: 1,
        rpc_url: "https://ethereum-rpc.publicnode.com",
    },
    NetworkEntry {
        name: "sepolia",
        chain_id: 11155111,
        rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
    },
    NetworkEntry {
        name: "matic",
        chain_id: 137,
        rpc_url: "https://polygon-bor-rpc.publicnode.com",
    },
    NetworkEntry {
        name: "bsc-mainnet",
        chain_id: 56,
        rpc_url: "https://bsc-rpc.publicnode.com",
    },
    NetworkEntry {
        name: "bsc-testnet",
        chain_id: 97,
        rpc_url: "https://bsc-testnet-rpc.publicnode.com",
    },
    NetworkEntry {
        name: "scroll-sepolia",
        chain_id: 534351,
        rpc_url: "https://scroll-sepolia-rpc.publicnode.com",
    },
];

impl NetworkEntry {
    fn descriptor(&self) -> NetworkDescriptor {
        NetworkDescriptor {
            name: self.name.to_string(),
            rpc_url: Url::parse(self.rpc_url).expect("static registry URL"),
            chain_id: self.chain_id,
        }
    }
}

/// Resolve a network identifier to its descriptor.
///
/// Performs no network I/O. Fails with [`DeployError::UnknownNetwork`] when
/// the identifier is absent from the registry.
pub fn resolve(name: &str) -> Result<NetworkDescriptor> {
    NETWORKS
        .iter()
        .find(|entry| entry.name == name)
        .map(NetworkEntry::descriptor)
        .ok_or_else(|| DeployError::UnknownNetwork(name.to_string()))
}

/// Reverse lookup by chain ID, used to retarget a run onto the network a
/// delegated wallet session is actually connected to.
pub fn find_by_chain_id(chain_id: u64) -> Option<NetworkDescriptor> {
    NETWORKS
        .iter()
        .find(|entry| entry.chain_id == chain_id)
        .map(NetworkEntry::descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_networks() {
        // Exercises the URL parse of every registry entry as well.
        for entry in NETWORKS {
            let descriptor = resolve(entry.name).expect("registry entry resolves");
            assert_eq!(descriptor.name, entry.name);
            assert_eq!(descriptor.chain_id, entry.chain_id);
        }
    }

    #[test]
    fn test_resolve_unknown_network() {
        let err = resolve("hardhat-localhost").unwrap_err();
        assert!(matches!(err, DeployError::UnknownNetwork(name) if name == "hardhat-localhost"));
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        assert!(resolve("Sepolia").is_err());
    }

    #[test]
    fn test_find_by_chain_id() {
        let descriptor = find_by_chain_id(97).expect("bsc-testnet is registered");
        assert_eq!(descriptor.name, "bsc-testnet");
        assert!(find_by_chain_id(31337).is_none());
    }

    #[test]
    fn test_rpc_override_keeps_identity() {
        let custom = Url::parse("http://localhost:8545").unwrap();
        let descriptor = resolve("sepolia").unwrap().with_rpc_url(custom.clone());
        assert_eq!(descriptor.rpc_url, custom);
        assert_eq!(descriptor.chain_id, 11155111);
        assert_eq!(descriptor.name, "sepolia");
    }
}
