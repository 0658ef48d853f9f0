//! Delegated wallet sessions.
//!
//! A wallet session is a JSON-RPC bridge to a browser wallet: the bridge
//! exposes the wallet's accounts and forwards `eth_sendTransaction` requests
//! to it for interactive approval. The operator never hands a key to this
//! process; the wallet signs.

use std::time::Duration;

use alloy_core::primitives::{Address, B256};
use serde_json::json;
use url::Url;

use crate::error::{DeployError, Result};
use crate::rpc;

/// How long to wait for the wallet to expose an account on connect.
pub const SESSION_CONNECT_TIMEOUT: Duration = Duration::from_secs(120);

/// An established session against a wallet bridge.
#[derive(Debug, Clone)]
pub struct WalletSession {
    client: reqwest::Client,
    bridge_url: Url,
    /// First account exposed by the wallet, used as the deploying account.
    pub account: Address,
    /// Chain the session was bound to when established.
    pub chain_id: u64,
}

impl WalletSession {
    /// Establish a session: request account access, then read the chain the
    /// wallet is connected to.
    ///
    /// `eth_requestAccounts` blocks until the wallet approves or rejects the
    /// connection prompt, so the whole handshake is bounded by `timeout`.
    pub async fn connect(bridge_url: Url, timeout: Duration) -> Result<Self> {
        let client = rpc::create_session_client()?;

        let handshake = async {
            let accounts: Vec<Address> =
                rpc::json_rpc_call(&client, &bridge_url, "eth_requestAccounts", vec![]).await?;
            let account = accounts.first().copied().ok_or(DeployError::NoActiveSession)?;
            let chain_id = rpc::chain_id(&client, &bridge_url).await?;
            Ok::<_, DeployError>((account, chain_id))
        };

        let (account, chain_id) = tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| DeployError::NoActiveSession)??;

        tracing::info!(%account, chain_id, "wallet session established");

        Ok(Self {
            client,
            bridge_url,
            account,
            chain_id,
        })
    }

    /// Re-check that the session still exists and is still bound to
    /// `expected_chain_id`.
    ///
    /// Wallets let the user switch networks or disconnect mid-run, so this
    /// runs before every transaction submission.
    pub async fn verify_still_bound(&self, expected_chain_id: u64) -> Result<()> {
        let accounts: Vec<Address> =
            rpc::json_rpc_call(&self.client, &self.bridge_url, "eth_accounts", vec![]).await?;
        if !accounts.contains(&self.account) {
            return Err(DeployError::NoActiveSession);
        }

        let session_chain_id = rpc::chain_id(&self.client, &self.bridge_url).await?;
        if session_chain_id != expected_chain_id {
            return Err(DeployError::NetworkMismatch {
                session_chain_id,
                expected_chain_id,
            });
        }
        Ok(())
    }

    /// Forward a contract-creation transaction to the wallet for signing and
    /// submission, returning the transaction hash once the user approves.
    pub async fn send_creation_transaction(&self, init_code: &[u8]) -> Result<B256> {
        let tx_hash = rpc::json_rpc_call(
            &self.client,
            &self.bridge_url,
            "eth_sendTransaction",
            vec![json!({
                "from": self.account,
                "data": format!("0x{}", hex::encode(init_code)),
            })],
        )
        .await?;
        Ok(tx_hash)
    }

    /// Fetch a receipt through the bridge, `None` while the transaction is
    /// unmined.
    pub async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<rpc::TransactionReceipt>> {
        Ok(rpc::transaction_receipt(&self.client, &self.bridge_url, tx_hash).await?)
    }
}
