//! Error taxonomy for the deployment orchestrator.

use alloy_core::primitives::B256;
use thiserror::Error;

use crate::pipeline::DeployStage;

pub type Result<T> = std::result::Result<T, DeployError>;

#[derive(Debug, Error)]
pub enum DeployError {
    /// Missing or invalid required input, detected before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested network identifier is not in the registry.
    #[error("unknown network: {0}")]
    UnknownNetwork(String),

    /// Local-key signing was requested but no private key is available.
    #[error("no private key provided for local-key signing")]
    MissingCredential,

    /// No wallet session is connected on the bridge endpoint.
    #[error("no active wallet session")]
    NoActiveSession,

    /// The wallet session reports a different chain than the run targets.
    #[error("wallet session is on chain {session_chain_id}, expected chain {expected_chain_id}")]
    NetworkMismatch {
        session_chain_id: u64,
        expected_chain_id: u64,
    },

    /// A compiled contract artifact is absent from the artifact set.
    #[error("contract artifact missing: {0}")]
    MissingArtifact(String),

    /// Multisig owner list or confirmation threshold rejected before submission.
    #[error("invalid multisig parameters: {0}")]
    InvalidMultisigParams(String),

    /// A stage's contract-creation transaction failed to submit or execute.
    #[error("{stage} stage failed")]
    StageSubmission {
        stage: DeployStage,
        #[source]
        source: anyhow::Error,
    },

    /// A submitted stage transaction was not confirmed in time.
    #[error("{stage} stage not confirmed within {timeout_secs}s (tx {tx_hash})")]
    StageConfirmationTimeout {
        stage: DeployStage,
        tx_hash: B256,
        timeout_secs: u64,
    },

    /// The deployment record could not be written. On-chain state is already
    /// final when this is raised.
    #[error("failed to persist deployment record")]
    Persistence(#[source] anyhow::Error),

    /// Generic RPC or transport error.
    #[error(transparent)]
    Rpc(#[from] anyhow::Error),
}
