//! Signing credentials for contract creation.
//!
//! Two modes exist: a local private key, which signs legacy EIP-155
//! transactions in-process and submits them raw, and a delegated wallet
//! session, which forwards unsigned transactions to a browser wallet for
//! interactive approval.

use std::time::Duration;

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{B256, Bytes, TxKind};
use alloy_eips::eip2718::Encodable2718;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DeployError, Result};
use crate::network::{self, NetworkDescriptor};
use crate::pipeline::ContractDeployer;
use crate::rpc::{self, TransactionReceipt};
use crate::session::WalletSession;

/// Which credential a run signs with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SignerMode {
    /// Sign in-process with a locally held private key.
    #[default]
    LocalKey,
    /// Delegate signing to a connected browser wallet.
    Session,
}

/// What to do when a wallet session is bound to a different chain than the
/// requested network.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MismatchPolicy {
    /// Fail the run. Deploying to whatever chain the wallet happens to be on
    /// is not acceptable without explicit operator opt-in.
    #[default]
    Abort,
    /// Retarget the run onto the session's chain, if it is a registered
    /// network.
    Retarget,
}

/// Headroom applied on top of `eth_estimateGas` for creation transactions.
fn gas_limit_with_headroom(estimate: u64) -> u64 {
    estimate + estimate / 5
}

/// An acquired credential, ready to submit creation transactions to one
/// network.
#[derive(Debug)]
pub enum Credential {
    LocalKey {
        signer: PrivateKeySigner,
        client: reqwest::Client,
        network: NetworkDescriptor,
        /// Locally tracked nonce, seeded from pending state at acquisition.
        nonce: u64,
    },
    Session {
        session: WalletSession,
        network: NetworkDescriptor,
    },
}

impl Credential {
    /// Acquire a local-key credential for `network`.
    ///
    /// Parses the key, then seeds the nonce from the network's pending state
    /// so consecutive stage submissions do not race the node's view.
    pub async fn local_key(private_key: Option<&str>, network: NetworkDescriptor) -> Result<Self> {
        let raw = private_key.ok_or(DeployError::MissingCredential)?;
        let signer: PrivateKeySigner = raw
            .trim_start_matches("0x")
            .parse()
            .map_err(|_| DeployError::Configuration("invalid private key".to_string()))?;

        let client = rpc::create_client()?;
        let nonce = rpc::transaction_count(&client, &network.rpc_url, signer.address()).await?;
        tracing::info!(
            address = %signer.address(),
            network = %network.name,
            nonce,
            "local signer ready"
        );

        Ok(Self::LocalKey {
            signer,
            client,
            network,
            nonce,
        })
    }

    /// Acquire a delegated wallet session for `network`.
    ///
    /// When the session is bound to a different chain, `policy` decides
    /// between aborting and retargeting the run onto the session's chain.
    /// Retargeting still fails if that chain is not a registered network.
    pub async fn session(
        bridge_url: Url,
        network: NetworkDescriptor,
        timeout: Duration,
        policy: MismatchPolicy,
    ) -> Result<Self> {
        let session = WalletSession::connect(bridge_url, timeout).await?;

        let network = if session.chain_id == network.chain_id {
            network
        } else {
            match policy {
                MismatchPolicy::Abort => {
                    return Err(DeployError::NetworkMismatch {
                        session_chain_id: session.chain_id,
                        expected_chain_id: network.chain_id,
                    });
                }
                MismatchPolicy::Retarget => {
                    let retargeted = network::find_by_chain_id(session.chain_id).ok_or(
                        DeployError::NetworkMismatch {
                            session_chain_id: session.chain_id,
                            expected_chain_id: network.chain_id,
                        },
                    )?;
                    tracing::warn!(
                        requested = %network.name,
                        actual = %retargeted.name,
                        "session is on a different network, retargeting run"
                    );
                    retargeted
                }
            }
        };

        Ok(Self::Session { session, network })
    }

    /// The network this credential submits to. For sessions this reflects a
    /// retarget, so callers record against the network actually deployed to.
    pub fn network(&self) -> &NetworkDescriptor {
        match self {
            Self::LocalKey { network, .. } => network,
            Self::Session { network, .. } => network,
        }
    }
}

impl ContractDeployer for Credential {
    async fn submit_creation(&mut self, init_code: Bytes) -> Result<B256> {
        match self {
            Self::LocalKey {
                signer,
                client,
                network,
                nonce,
            } => {
                let gas_price = rpc::gas_price(client, &network.rpc_url).await?;
                let estimate =
                    rpc::estimate_gas(client, &network.rpc_url, signer.address(), &init_code)
                        .await?;

                let tx = TxLegacy {
                    chain_id: Some(network.chain_id),
                    nonce: *nonce,
                    gas_price,
                    gas_limit: gas_limit_with_headroom(estimate),
                    to: TxKind::Create,
                    value: Default::default(),
                    input: init_code,
                };
                let signature = signer
                    .sign_hash_sync(&tx.signature_hash())
                    .context("Failed to sign creation transaction")?;
                let envelope = TxEnvelope::Legacy(tx.into_signed(signature));

                let tx_hash =
                    rpc::send_raw_transaction(client, &network.rpc_url, &envelope.encoded_2718())
                        .await?;
                *nonce += 1;
                Ok(tx_hash)
            }
            Self::Session { session, network } => {
                // The wallet can be switched or disconnected between stages.
                session.verify_still_bound(network.chain_id).await?;
                session.send_creation_transaction(&init_code).await
            }
        }
    }

    async fn creation_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
        match self {
            Self::LocalKey {
                client, network, ..
            } => Ok(rpc::transaction_receipt(client, &network.rpc_url, tx_hash).await?),
            Self::Session { session, .. } => session.transaction_receipt(tx_hash).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_signer_mode_round_trip() {
        assert_eq!(SignerMode::LocalKey.to_string(), "local-key");
        assert_eq!(SignerMode::from_str("session").unwrap(), SignerMode::Session);
        assert!(SignerMode::from_str("hardware").is_err());
    }

    #[test]
    fn test_mismatch_policy_defaults_to_abort() {
        assert_eq!(MismatchPolicy::default(), MismatchPolicy::Abort);
        assert_eq!(MismatchPolicy::from_str("retarget").unwrap(), MismatchPolicy::Retarget);
    }

    #[test]
    fn test_gas_headroom() {
        assert_eq!(gas_limit_with_headroom(100_000), 120_000);
        assert_eq!(gas_limit_with_headroom(0), 0);
    }

    #[tokio::test]
    async fn test_local_key_requires_a_key() {
        let network = crate::network::resolve("sepolia").unwrap();
        let err = Credential::local_key(None, network).await.unwrap_err();
        assert!(matches!(err, DeployError::MissingCredential));
    }

    #[tokio::test]
    async fn test_local_key_rejects_garbage_key() {
        let network = crate::network::resolve("sepolia").unwrap();
        let err = Credential::local_key(Some("not-a-key"), network)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Configuration(_)));
    }

    #[test]
    fn test_private_key_parsing() {
        // Well-known throwaway test vector key.
        let raw = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let signer: PrivateKeySigner = raw.trim_start_matches("0x").parse().unwrap();
        assert_eq!(
            signer.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }
}
