//! Durable per-network deployment records.
//!
//! After a run completes on chain, the resulting addresses are written to
//! `<records_dir>/<network>.json`. Records are keyed by network name; a
//! re-deploy overwrites the previous record for that network and leaves all
//! other networks untouched.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Address;
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DeployError, Result};
use crate::pipeline::DeployedContracts;

/// The saved outcome of one deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// Network the contracts live on.
    pub network: String,
    pub token_address: Address,
    pub multisig_address: Address,
    pub vesting_address: Address,
    /// Completion time, RFC 3339 in UTC.
    pub deployment_time: String,
}

impl DeploymentRecord {
    pub fn new(network: &str, contracts: &DeployedContracts, completed_at: DateTime<Utc>) -> Self {
        Self {
            network: network.to_string(),
            token_address: contracts.token,
            multisig_address: contracts.multisig,
            vesting_address: contracts.vesting,
            deployment_time: completed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Path of the record file for `network` under `records_dir`.
    pub fn path_for(records_dir: &Path, network: &str) -> PathBuf {
        records_dir.join(format!("{network}.json"))
    }

    /// Write the record, creating `records_dir` if needed and replacing any
    /// previous record for the same network.
    ///
    /// A failure here is raised as [`DeployError::Persistence`]: the
    /// contracts are already live on chain, only the local record is lost.
    pub fn persist(&self, records_dir: &Path) -> Result<PathBuf> {
        let write = || -> anyhow::Result<PathBuf> {
            std::fs::create_dir_all(records_dir).with_context(|| {
                format!("Failed to create records dir {}", records_dir.display())
            })?;
            let path = Self::path_for(records_dir, &self.network);
            let contents =
                serde_json::to_string_pretty(self).context("Failed to serialize record")?;
            std::fs::write(&path, contents)
                .with_context(|| format!("Failed to write record {}", path.display()))?;
            Ok(path)
        };
        let path = write().map_err(DeployError::Persistence)?;
        tracing::info!(path = %path.display(), "deployment record written");
        Ok(path)
    }

    /// Read the record for `network`, if one exists.
    pub fn load(records_dir: &Path, network: &str) -> Result<Option<Self>> {
        let path = Self::path_for(records_dir, network);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read record {}", path.display()))?;
        let record = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse record {}", path.display()))?;
        Ok(Some(record))
    }
}
