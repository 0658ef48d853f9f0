//! cvt-deploy - Deployment library for the CVT contract suite.
//!
//! This crate provisions the three interdependent CVT contracts (token,
//! multisig, vesting) on a target network, signing either with a local
//! private key or through a delegated browser-wallet session, and records
//! the resulting addresses per network.

pub mod artifacts;
pub mod config;
pub mod credential;
mod error;
pub mod network;
pub mod pipeline;
pub mod record;
pub mod rpc;
pub mod session;

pub use artifacts::ArtifactSet;
pub use config::DeployConfig;
pub use credential::{Credential, MismatchPolicy, SignerMode};
pub use error::{DeployError, Result};
pub use network::NetworkDescriptor;
pub use pipeline::{ContractDeployer, DeployedContracts, DeployStage, MultisigParams, Pipeline};
pub use record::DeploymentRecord;
pub use session::WalletSession;
