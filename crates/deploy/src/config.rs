//! Run configuration.
//!
//! A run is configured from CLI flags and environment variables, optionally
//! persisted to a `Cvtup.toml` file for repeatable deployments. The private
//! key is never written to disk.

use std::path::PathBuf;
use std::time::Duration;

use alloy_core::primitives::Address;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::credential::{MismatchPolicy, SignerMode};
use crate::error::{DeployError, Result};
use crate::pipeline::MultisigParams;
use crate::session::SESSION_CONNECT_TIMEOUT;

/// Default name of the configuration file.
pub const CVTCONF_FILENAME: &str = "Cvtup.toml";

/// Default directory for deployment records.
pub const DEFAULT_RECORDS_DIR: &str = "deployments";

/// Default directory for compiled contract artifacts.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Environment variable naming the multisig owners, numbered from 1.
const OWNER_ENV_PREFIX: &str = "CVT_MULTISIG_OWNER_";

/// Full configuration of one deployment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Target network identifier, e.g. `sepolia`.
    pub network: String,
    /// Per-network RPC endpoint override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,
    pub signer_mode: SignerMode,
    /// Private key for local-key signing. Never serialized.
    #[serde(skip_serializing, default)]
    pub private_key: Option<String>,
    /// Wallet bridge endpoint for session signing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_bridge_url: Option<Url>,
    pub mismatch_policy: MismatchPolicy,
    /// Seconds to wait for the wallet connection prompt.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    /// Multisig owner accounts, hex-encoded.
    #[serde(default)]
    pub multisig_owners: Vec<String>,
    pub confirmations_required: usize,
    pub artifacts_dir: PathBuf,
    pub records_dir: PathBuf,
}

fn default_session_timeout_secs() -> u64 {
    SESSION_CONNECT_TIMEOUT.as_secs()
}

impl DeployConfig {
    /// Environment variable for a per-network RPC override, e.g.
    /// `CVT_BSC_TESTNET_RPC_URL` for `bsc-testnet`.
    pub fn rpc_env_key(network: &str) -> String {
        format!(
            "CVT_{}_RPC_URL",
            network.to_uppercase().replace('-', "_")
        )
    }

    /// Collect numbered multisig owners from an environment-like lookup,
    /// scanning `CVT_MULTISIG_OWNER_1`, `_2`, ... until the first gap.
    pub fn owners_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut owners = Vec::new();
        for index in 1.. {
            match lookup(&format!("{OWNER_ENV_PREFIX}{index}")) {
                Some(owner) => owners.push(owner),
                None => break,
            }
        }
        owners
    }

    /// Parse the configured owner strings into addresses.
    pub fn parsed_owners(&self) -> Result<Vec<Address>> {
        self.multisig_owners
            .iter()
            .map(|raw| {
                raw.parse().map_err(|_| {
                    DeployError::Configuration(format!("invalid multisig owner address: {raw}"))
                })
            })
            .collect()
    }

    /// Build the multisig parameters for the pipeline.
    pub fn multisig_params(&self) -> Result<MultisigParams> {
        Ok(MultisigParams {
            owners: self.parsed_owners()?,
            confirmations_required: self.confirmations_required,
        })
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Save the configuration to a TOML file. The private key is skipped.
    pub fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Load the configuration from a TOML file or a directory containing
    /// [`CVTCONF_FILENAME`].
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(DeployError::Configuration(format!(
                "configuration file or directory not found: {}",
                path.display()
            )));
        }

        let config_path = if path.is_dir() {
            path.join(CVTCONF_FILENAME)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read_to_string(&config_path)
            .context(format!("Failed to read config from {}", config_path.display()))?;
        let config: Self =
            toml::from_str(&content).context("Failed to parse config file as TOML")?;
        tracing::info!(path = %config_path.display(), "Configuration loaded");
        Ok(config)
    }
}
