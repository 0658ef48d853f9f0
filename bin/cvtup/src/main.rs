//! cvtup deploys the CVT token, multisig and vesting contracts to a target
//! network and records the resulting addresses.

mod cli;

use anyhow::Result;
use clap::Parser;
use cvt_deploy::{
    ArtifactSet, Credential, DeployConfig, DeployError, DeploymentRecord, MismatchPolicy, Pipeline,
    SignerMode, network,
};

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = build_config(&cli)?;

    // Everything that can fail without a network call fails here, before a
    // credential is acquired or a transaction goes out. The multisig owner
    // list itself is checked at its own stage, not up front.
    let descriptor = resolve_network(&config)?;
    let multisig_params = config.multisig_params()?;
    let artifacts = ArtifactSet::load_from_dir(&config.artifacts_dir)?;

    if cli.save_config {
        config.save_to_file(&std::path::PathBuf::from(
            cvt_deploy::config::CVTCONF_FILENAME,
        ))?;
    }

    tracing::info!(
        network = %descriptor.name,
        chain_id = descriptor.chain_id,
        signer_mode = %config.signer_mode,
        "Starting deployment"
    );

    let mut credential = match config.signer_mode {
        SignerMode::LocalKey => {
            Credential::local_key(config.private_key.as_deref(), descriptor).await?
        }
        SignerMode::Session => {
            let bridge_url = config.session_bridge_url.clone().ok_or_else(|| {
                DeployError::Configuration(
                    "session signing requires a wallet bridge URL".to_string(),
                )
            })?;
            Credential::session(
                bridge_url,
                descriptor,
                config.session_timeout(),
                config.mismatch_policy,
            )
            .await?
        }
    };

    // A session may have retargeted the run; record against the network the
    // contracts actually land on.
    let network_name = credential.network().name.clone();

    let pipeline = Pipeline::new(artifacts, multisig_params);
    let deployed = pipeline.run(&mut credential).await?;

    tracing::info!(
        network = %network_name,
        token = %deployed.token,
        multisig = %deployed.multisig,
        vesting = %deployed.vesting,
        "All contracts deployed"
    );

    let record = DeploymentRecord::new(&network_name, &deployed, chrono::Utc::now());
    if let Err(err) = record.persist(&config.records_dir) {
        // The contracts are live on chain; only the local record failed.
        tracing::error!(
            token = %deployed.token,
            multisig = %deployed.multisig,
            vesting = %deployed.vesting,
            "Contracts are live on chain but the deployment record failed to save; \
             save the addresses above manually"
        );
        return Err(err.into());
    }

    Ok(())
}

/// Build the run configuration from a config file or CLI arguments.
///
/// The private key and owner list are environment-sourced either way, so a
/// saved config file never needs to carry secrets.
fn build_config(cli: &Cli) -> Result<DeployConfig> {
    let mut config = if let Some(config_path) = &cli.config {
        let config = DeployConfig::load_from_file(config_path)?;
        tracing::info!(
            config_path = %config_path.display(),
            network = %config.network,
            "Loading deployment from config file..."
        );
        config
    } else {
        let owners = if cli.multisig_owners.is_empty() {
            DeployConfig::owners_from_lookup(|key| std::env::var(key).ok())
        } else {
            cli.multisig_owners.clone()
        };
        let confirmations_required = cli.confirmations_required.unwrap_or(owners.len());
        let mismatch_policy = if cli.allow_session_network {
            MismatchPolicy::Retarget
        } else {
            MismatchPolicy::Abort
        };

        DeployConfig {
            network: cli.network.clone(),
            rpc_url: cli.rpc_url.clone(),
            signer_mode: cli.signer_mode,
            private_key: None,
            session_bridge_url: cli.session_bridge_url.clone(),
            mismatch_policy,
            session_timeout_secs: cli.session_timeout,
            multisig_owners: owners,
            confirmations_required,
            artifacts_dir: cli.artifacts_dir.clone(),
            records_dir: cli.records_dir.clone(),
        }
    };

    config.private_key = cli.private_key.clone();
    Ok(config)
}

/// Resolve the target network and apply RPC overrides, most specific first.
fn resolve_network(config: &DeployConfig) -> Result<cvt_deploy::NetworkDescriptor> {
    let mut descriptor = network::resolve(&config.network)?;

    if let Some(rpc_url) = &config.rpc_url {
        descriptor = descriptor.with_rpc_url(rpc_url.clone());
    } else if let Ok(raw) = std::env::var(DeployConfig::rpc_env_key(&config.network)) {
        let url = raw.parse().map_err(|_| {
            DeployError::Configuration(format!("invalid RPC URL override: {raw}"))
        })?;
        descriptor = descriptor.with_rpc_url(url);
    }

    Ok(descriptor)
}
