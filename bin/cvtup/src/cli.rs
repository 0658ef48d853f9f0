use std::path::PathBuf;

use clap::Parser;
use cvt_deploy::config::{DEFAULT_ARTIFACTS_DIR, DEFAULT_RECORDS_DIR};
use cvt_deploy::SignerMode;
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "cvtup")]
#[command(
    author,
    version,
    about = "Deploy the CVT token, multisig and vesting contracts in one run"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "CVT_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// The target network identifier (e.g. sepolia, matic, bsc-testnet).
    #[arg(short, long, env = "CVT_NETWORK", default_value = "sepolia")]
    pub network: String,

    /// Override the network's default RPC endpoint.
    ///
    /// Also settable per network via CVT_<NETWORK>_RPC_URL (dashes become
    /// underscores, e.g. CVT_BSC_TESTNET_RPC_URL).
    #[arg(long, alias = "rpc", env = "CVT_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Who signs the creation transactions.
    #[arg(long, env = "CVT_SIGNER_MODE", default_value_t = SignerMode::LocalKey)]
    pub signer_mode: SignerMode,

    /// Private key for local-key signing.
    #[arg(long, env = "CVT_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Wallet bridge endpoint for session signing.
    #[arg(long, alias = "bridge", env = "CVT_SESSION_BRIDGE_URL")]
    pub session_bridge_url: Option<Url>,

    /// Keep going when the wallet session is on a different network than
    /// requested, retargeting the run onto the session's network.
    ///
    /// Without this flag a session on the wrong network aborts the run.
    #[arg(long, env = "CVT_ALLOW_SESSION_NETWORK", default_value_t = false)]
    pub allow_session_network: bool,

    /// Seconds to wait for the wallet connection prompt.
    #[arg(long, env = "CVT_SESSION_TIMEOUT", default_value_t = 120)]
    pub session_timeout: u64,

    /// Multisig owner addresses.
    ///
    /// If not provided, owners are collected from CVT_MULTISIG_OWNER_1,
    /// CVT_MULTISIG_OWNER_2, ... until the first unset variable.
    #[arg(long = "owner", value_name = "ADDRESS")]
    pub multisig_owners: Vec<String>,

    /// Confirmations required to execute a multisig transaction.
    #[arg(long, env = "CVT_CONFIRMATIONS_REQUIRED")]
    pub confirmations_required: Option<usize>,

    /// Directory holding the compiled contract artifacts.
    #[arg(long, env = "CVT_ARTIFACTS_DIR", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    /// Directory where deployment records are written.
    #[arg(long, env = "CVT_RECORDS_DIR", default_value = DEFAULT_RECORDS_DIR)]
    pub records_dir: PathBuf,

    /// Path to an existing Cvtup.toml configuration file to load.
    ///
    /// When provided, the deployment uses the configuration from this file
    /// instead of building one from CLI arguments. The private key still
    /// comes from --private-key or CVT_PRIVATE_KEY.
    #[arg(long, alias = "conf", env = "CVT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Save the effective configuration to ./Cvtup.toml before deploying.
    #[arg(long, env = "CVT_SAVE_CONFIG", default_value_t = false)]
    pub save_config: bool,
}
