//! Shared JSON-RPC utilities for interacting with Ethereum endpoints.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Context;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Create a client without a request timeout.
///
/// Wallet-bridge calls may block on a human approving a prompt, so the
/// caller bounds them with `tokio::time::timeout` where a bound applies.
pub fn create_session_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error: {}",
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Receipt of a mined transaction, as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    /// Address of the created contract, present for creation transactions.
    pub contract_address: Option<Address>,
    #[serde(default, deserialize_with = "deserialize_opt_hex_u64")]
    pub status: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_opt_hex_u64")]
    pub block_number: Option<u64>,
}

impl TransactionReceipt {
    /// Whether execution succeeded. Pre-Byzantium receipts carry no status
    /// field and are treated as successful.
    pub fn succeeded(&self) -> bool {
        self.status != Some(0)
    }
}

/// Parse a 0x-prefixed hex quantity to u64.
pub fn parse_hex_u64(raw: &str) -> Result<u64, anyhow::Error> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16)
        .with_context(|| format!("Invalid hex quantity: {}", raw))
}

/// Deserialize an optional hex quantity (e.g. receipt status "0x1").
fn deserialize_opt_hex_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Deserialize::deserialize(deserializer)?;
    raw.map(|s| {
        u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
    })
    .transpose()
}

/// Query `eth_chainId` from an endpoint.
pub async fn chain_id(client: &reqwest::Client, url: &Url) -> Result<u64, anyhow::Error> {
    let result: String = json_rpc_call(client, url, "eth_chainId", vec![]).await?;
    parse_hex_u64(&result)
}

/// Query the pending-state nonce for an account.
pub async fn transaction_count(
    client: &reqwest::Client,
    url: &Url,
    address: Address,
) -> Result<u64, anyhow::Error> {
    let result: String = json_rpc_call(
        client,
        url,
        "eth_getTransactionCount",
        vec![serde_json::json!(address), serde_json::json!("pending")],
    )
    .await?;
    parse_hex_u64(&result)
}

/// Query `eth_gasPrice`.
pub async fn gas_price(client: &reqwest::Client, url: &Url) -> Result<u128, anyhow::Error> {
    let result: String = json_rpc_call(client, url, "eth_gasPrice", vec![]).await?;
    u128::from_str_radix(result.trim_start_matches("0x"), 16)
        .with_context(|| format!("Invalid hex quantity: {}", result))
}

/// Estimate gas for a contract-creation transaction.
pub async fn estimate_gas(
    client: &reqwest::Client,
    url: &Url,
    from: Address,
    init_code: &Bytes,
) -> Result<u64, anyhow::Error> {
    let result: String = json_rpc_call(
        client,
        url,
        "eth_estimateGas",
        vec![serde_json::json!({
            "from": from,
            "data": init_code,
        })],
    )
    .await?;
    parse_hex_u64(&result)
}

/// Submit a signed raw transaction, returning its hash.
pub async fn send_raw_transaction(
    client: &reqwest::Client,
    url: &Url,
    raw: &[u8],
) -> Result<B256, anyhow::Error> {
    json_rpc_call(
        client,
        url,
        "eth_sendRawTransaction",
        vec![serde_json::json!(format!("0x{}", hex::encode(raw)))],
    )
    .await
}

/// Fetch the receipt for a transaction, `None` while it is unmined.
pub async fn transaction_receipt(
    client: &reqwest::Client,
    url: &Url,
    tx_hash: B256,
) -> Result<Option<TransactionReceipt>, anyhow::Error> {
    json_rpc_call(
        client,
        url,
        "eth_getTransactionReceipt",
        vec![serde_json::json!(tx_hash)],
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x1").unwrap(), 1);
        assert_eq!(parse_hex_u64("0xaa36a7").unwrap(), 11155111);
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn test_receipt_deserialization() {
        let raw = serde_json::json!({
            "transactionHash": "0x2f0f3f2bdd0e0a4eadc98ca0ded1e8b146a83a60c3ff0a7bf3a5e1d2f1c8e9aa",
            "contractAddress": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
            "status": "0x1",
            "blockNumber": "0x10"
        });
        let receipt: TransactionReceipt = serde_json::from_value(raw).unwrap();
        assert!(receipt.succeeded());
        assert!(receipt.contract_address.is_some());
        assert_eq!(receipt.block_number, Some(16));
    }

    #[test]
    fn test_reverted_receipt() {
        let raw = serde_json::json!({
            "transactionHash": "0x2f0f3f2bdd0e0a4eadc98ca0ded1e8b146a83a60c3ff0a7bf3a5e1d2f1c8e9aa",
            "contractAddress": null,
            "status": "0x0"
        });
        let receipt: TransactionReceipt = serde_json::from_value(raw).unwrap();
        assert!(!receipt.succeeded());
        assert!(receipt.contract_address.is_none());
    }

    #[test]
    fn test_receipt_without_status_is_success() {
        let raw = serde_json::json!({
            "transactionHash": "0x2f0f3f2bdd0e0a4eadc98ca0ded1e8b146a83a60c3ff0a7bf3a5e1d2f1c8e9aa"
        });
        let receipt: TransactionReceipt = serde_json::from_value(raw).unwrap();
        assert!(receipt.succeeded());
    }
}
