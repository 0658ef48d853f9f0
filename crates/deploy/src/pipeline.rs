//! Ordered three-stage deployment pipeline.
//!
//! Stages run strictly in sequence: token, then multisig, then vesting. The
//! multisig and vesting constructors both take the token address, so stage 1
//! must be confirmed before stages 2 and 3 can build their init code. Any
//! stage failure aborts the run; nothing is recorded for a partial run.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256};
use alloy_core::sol_types::SolValue;
use backon::{ConstantBuilder, Retryable};

use crate::artifacts::{ArtifactSet, MULTISIG_CONTRACT, TOKEN_CONTRACT, VESTING_CONTRACT};
use crate::error::{DeployError, Result};
use crate::rpc::TransactionReceipt;

/// Pause after each stage's submission before the first confirmation check,
/// giving RPC nodes behind load balancers time to see the transaction.
pub const STAGE_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Interval between receipt polls for a submitted transaction.
pub const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// How long to poll for a confirmation before giving up on a stage.
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);

/// The three pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeployStage {
    Token,
    Multisig,
    Vesting,
}

/// Multisig constructor parameters.
#[derive(Debug, Clone)]
pub struct MultisigParams {
    /// Owner accounts of the multisig wallet.
    pub owners: Vec<Address>,
    /// Confirmations required to execute a multisig transaction.
    pub confirmations_required: usize,
}

impl MultisigParams {
    /// Validate the owner set and threshold.
    ///
    /// Runs at the multisig stage rather than up front, so a token-only dry
    /// run against a test network is not blocked by a missing owner list.
    pub fn validate(&self) -> Result<()> {
        if self.owners.is_empty() {
            return Err(DeployError::InvalidMultisigParams(
                "owner list is empty".to_string(),
            ));
        }
        if self.confirmations_required == 0 {
            return Err(DeployError::InvalidMultisigParams(
                "confirmation threshold must be at least 1".to_string(),
            ));
        }
        if self.confirmations_required > self.owners.len() {
            return Err(DeployError::InvalidMultisigParams(format!(
                "confirmation threshold {} exceeds owner count {}",
                self.confirmations_required,
                self.owners.len()
            )));
        }
        Ok(())
    }
}

/// Addresses produced by a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContracts {
    pub token: Address,
    pub multisig: Address,
    pub vesting: Address,
}

/// Submits contract-creation transactions and observes their receipts.
///
/// Implemented by both credential modes; the pipeline is agnostic to who
/// holds the signing key.
pub trait ContractDeployer {
    /// Submit a creation transaction carrying `init_code`, returning its hash.
    async fn submit_creation(&mut self, init_code: Bytes) -> Result<B256>;

    /// Fetch the receipt for a submitted transaction, `None` while unmined.
    async fn creation_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>>;
}

/// The deployment pipeline for one network.
pub struct Pipeline {
    artifacts: ArtifactSet,
    multisig_params: MultisigParams,
}

impl Pipeline {
    pub fn new(artifacts: ArtifactSet, multisig_params: MultisigParams) -> Self {
        Self {
            artifacts,
            multisig_params,
        }
    }

    /// Run all three stages against `deployer`.
    pub async fn run<D: ContractDeployer>(&self, deployer: &mut D) -> Result<DeployedContracts> {
        let token = self
            .run_stage(deployer, DeployStage::Token, Bytes::new())
            .await?;
        tracing::info!(address = %token, "token deployed");

        self.multisig_params.validate()?;
        let multisig_args = (
            self.multisig_params.owners.clone(),
            U256::from(self.multisig_params.confirmations_required),
            token,
        )
            .abi_encode_params();
        let multisig = self
            .run_stage(deployer, DeployStage::Multisig, Bytes::from(multisig_args))
            .await?;
        tracing::info!(address = %multisig, "multisig deployed");

        // The vesting contract is bound to the token, not the multisig.
        let vesting_args = (token,).abi_encode_params();
        let vesting = self
            .run_stage(deployer, DeployStage::Vesting, Bytes::from(vesting_args))
            .await?;
        tracing::info!(address = %vesting, "vesting deployed");

        Ok(DeployedContracts {
            token,
            multisig,
            vesting,
        })
    }

    /// Submit one stage's creation transaction and wait for its receipt.
    async fn run_stage<D: ContractDeployer>(
        &self,
        deployer: &mut D,
        stage: DeployStage,
        constructor_args: Bytes,
    ) -> Result<Address> {
        let artifact = self.artifacts.get(Self::contract_name(stage))?;
        let mut init_code = artifact.bytecode.to_vec();
        init_code.extend_from_slice(&constructor_args);

        tracing::info!(%stage, "submitting contract creation");
        let tx_hash = deployer
            .submit_creation(Bytes::from(init_code))
            .await
            .map_err(|err| DeployError::StageSubmission {
                stage,
                source: err.into(),
            })?;
        tracing::debug!(%stage, %tx_hash, "creation transaction submitted");
        tokio::time::sleep(STAGE_SETTLE_DELAY).await;

        let receipt = self.await_confirmation(deployer, stage, tx_hash).await?;
        if !receipt.succeeded() {
            return Err(DeployError::StageSubmission {
                stage,
                source: anyhow::anyhow!("creation transaction {tx_hash} reverted"),
            });
        }
        receipt
            .contract_address
            .ok_or_else(|| DeployError::StageSubmission {
                stage,
                source: anyhow::anyhow!("receipt for {tx_hash} carries no contract address"),
            })
    }

    /// Poll for a receipt until confirmed or the stage timeout elapses.
    async fn await_confirmation<D: ContractDeployer>(
        &self,
        deployer: &D,
        stage: DeployStage,
        tx_hash: B256,
    ) -> Result<TransactionReceipt> {
        let max_times =
            (CONFIRMATION_TIMEOUT.as_secs() / CONFIRMATION_POLL_INTERVAL.as_secs()) as usize;
        let poll = || async {
            deployer
                .creation_receipt(tx_hash)
                .await?
                .ok_or(DeployError::StageConfirmationTimeout {
                    stage,
                    tx_hash,
                    timeout_secs: CONFIRMATION_TIMEOUT.as_secs(),
                })
        };
        poll.retry(
            ConstantBuilder::default()
                .with_delay(CONFIRMATION_POLL_INTERVAL)
                .with_max_times(max_times),
        )
        .when(|err| matches!(err, DeployError::StageConfirmationTimeout { .. }))
        .await
        .map_err(|err| match err {
            timeout @ DeployError::StageConfirmationTimeout { .. } => timeout,
            // Transport errors during polling carry the stage name too.
            other => DeployError::StageSubmission {
                stage,
                source: other.into(),
            },
        })
    }

    fn contract_name(stage: DeployStage) -> &'static str {
        match stage {
            DeployStage::Token => TOKEN_CONTRACT,
            DeployStage::Multisig => MULTISIG_CONTRACT,
            DeployStage::Vesting => VESTING_CONTRACT,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::artifacts::{ContractArtifact, REQUIRED_CONTRACTS};

    /// In-memory deployer that mints deterministic addresses per submission
    /// and can be told to fail at a given stage index.
    struct MockDeployer {
        submissions: Mutex<Vec<Bytes>>,
        fail_at: Option<usize>,
        revert_at: Option<usize>,
    }

    impl MockDeployer {
        fn new() -> Self {
            Self {
                submissions: Mutex::new(Vec::new()),
                fail_at: None,
                revert_at: None,
            }
        }

        fn failing_at(index: usize) -> Self {
            Self {
                fail_at: Some(index),
                ..Self::new()
            }
        }

        fn reverting_at(index: usize) -> Self {
            Self {
                revert_at: Some(index),
                ..Self::new()
            }
        }

        fn submission_count(&self) -> usize {
            self.submissions.lock().unwrap().len()
        }
    }

    impl ContractDeployer for MockDeployer {
        async fn submit_creation(&mut self, init_code: Bytes) -> Result<B256> {
            let mut submissions = self.submissions.lock().unwrap();
            let index = submissions.len();
            if self.fail_at == Some(index) {
                return Err(anyhow::anyhow!("node rejected transaction").into());
            }
            submissions.push(init_code);
            Ok(B256::with_last_byte(index as u8 + 1))
        }

        async fn creation_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
            let index = tx_hash[31] as usize - 1;
            let status = if self.revert_at == Some(index) { 0 } else { 1 };
            Ok(Some(TransactionReceipt {
                transaction_hash: tx_hash,
                contract_address: Some(Address::with_last_byte(0xA0 + index as u8)),
                status: Some(status),
                block_number: Some(100 + index as u64),
            }))
        }
    }

    fn artifacts() -> ArtifactSet {
        let map: HashMap<String, ContractArtifact> = REQUIRED_CONTRACTS
            .iter()
            .enumerate()
            .map(|(i, name)| {
                (
                    name.to_string(),
                    ContractArtifact {
                        abi: serde_json::json!([]),
                        bytecode: Bytes::from(vec![0x60, 0x80, i as u8]),
                    },
                )
            })
            .collect();
        ArtifactSet::from_map(map).unwrap()
    }

    fn owners(n: usize) -> Vec<Address> {
        (1..=n).map(|i| Address::with_last_byte(i as u8)).collect()
    }

    fn params(n_owners: usize, threshold: usize) -> MultisigParams {
        MultisigParams {
            owners: owners(n_owners),
            confirmations_required: threshold,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_deploys_in_order() {
        let pipeline = Pipeline::new(artifacts(), params(3, 2));
        let mut deployer = MockDeployer::new();

        let deployed = pipeline.run(&mut deployer).await.unwrap();
        assert_eq!(deployed.token, Address::with_last_byte(0xA0));
        assert_eq!(deployed.multisig, Address::with_last_byte(0xA1));
        assert_eq!(deployed.vesting, Address::with_last_byte(0xA2));

        let submissions = deployer.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 3);
        // Token creation carries bare bytecode, no constructor args.
        assert_eq!(submissions[0].as_ref(), &[0x60, 0x80, 0x00]);
        // Multisig and vesting init code starts with the stage's bytecode.
        assert_eq!(&submissions[1][..3], &[0x60, 0x80, 0x01]);
        assert_eq!(&submissions[2][..3], &[0x60, 0x80, 0x02]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multisig_args_carry_token_address() {
        let pipeline = Pipeline::new(artifacts(), params(2, 1));
        let mut deployer = MockDeployer::new();
        pipeline.run(&mut deployer).await.unwrap();

        let submissions = deployer.submissions.lock().unwrap();
        let expected = (owners(2), U256::from(1usize), Address::with_last_byte(0xA0))
            .abi_encode_params();
        assert_eq!(&submissions[1][3..], expected.as_slice());
    }

    #[tokio::test(start_paused = true)]
    async fn test_vesting_args_carry_token_not_multisig() {
        let pipeline = Pipeline::new(artifacts(), params(2, 1));
        let mut deployer = MockDeployer::new();
        pipeline.run(&mut deployer).await.unwrap();

        let submissions = deployer.submissions.lock().unwrap();
        let expected = (Address::with_last_byte(0xA0),).abi_encode_params();
        assert_eq!(&submissions[2][3..], expected.as_slice());
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_failure_aborts_before_multisig() {
        let pipeline = Pipeline::new(artifacts(), params(3, 2));
        let mut deployer = MockDeployer::failing_at(0);

        let err = pipeline.run(&mut deployer).await.unwrap_err();
        assert!(
            matches!(err, DeployError::StageSubmission { stage: DeployStage::Token, .. })
        );
        assert_eq!(deployer.submission_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multisig_failure_aborts_before_vesting() {
        let pipeline = Pipeline::new(artifacts(), params(3, 2));
        let mut deployer = MockDeployer::failing_at(1);

        let err = pipeline.run(&mut deployer).await.unwrap_err();
        assert!(
            matches!(err, DeployError::StageSubmission { stage: DeployStage::Multisig, .. })
        );
        // Only the token creation went out.
        assert_eq!(deployer.submission_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverted_creation_is_a_stage_failure() {
        let pipeline = Pipeline::new(artifacts(), params(3, 2));
        let mut deployer = MockDeployer::reverting_at(0);

        let err = pipeline.run(&mut deployer).await.unwrap_err();
        assert!(
            matches!(err, DeployError::StageSubmission { stage: DeployStage::Token, .. })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_owner_list_fails_after_token_stage() {
        // The token stage is allowed to run; validation bites at stage 2.
        let pipeline = Pipeline::new(artifacts(), params(0, 1));
        let mut deployer = MockDeployer::new();

        let err = pipeline.run(&mut deployer).await.unwrap_err();
        assert!(matches!(err, DeployError::InvalidMultisigParams(_)));
        assert_eq!(deployer.submission_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_precedes_first_receipt_poll() {
        use tokio::time::Instant;

        struct TimingDeployer {
            submitted_at: Mutex<Vec<Instant>>,
            first_polled_at: Mutex<Vec<Option<Instant>>>,
        }

        impl ContractDeployer for TimingDeployer {
            async fn submit_creation(&mut self, _init_code: Bytes) -> Result<B256> {
                let mut submitted = self.submitted_at.lock().unwrap();
                let index = submitted.len();
                submitted.push(Instant::now());
                self.first_polled_at.lock().unwrap().push(None);
                Ok(B256::with_last_byte(index as u8 + 1))
            }

            async fn creation_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
                let index = tx_hash[31] as usize - 1;
                self.first_polled_at.lock().unwrap()[index].get_or_insert_with(Instant::now);
                Ok(Some(TransactionReceipt {
                    transaction_hash: tx_hash,
                    contract_address: Some(Address::with_last_byte(0xA0 + index as u8)),
                    status: Some(1),
                    block_number: Some(100 + index as u64),
                }))
            }
        }

        let pipeline = Pipeline::new(artifacts(), params(1, 1));
        let mut deployer = TimingDeployer {
            submitted_at: Mutex::new(Vec::new()),
            first_polled_at: Mutex::new(Vec::new()),
        };
        pipeline.run(&mut deployer).await.unwrap();

        // Every stage settles after submission, before its first receipt poll.
        let submitted = deployer.submitted_at.lock().unwrap();
        let polled = deployer.first_polled_at.lock().unwrap();
        assert_eq!(submitted.len(), 3);
        for (submitted_at, first_poll) in submitted.iter().zip(polled.iter()) {
            assert!(first_poll.unwrap() - *submitted_at >= STAGE_SETTLE_DELAY);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_poll_error_names_the_stage() {
        struct BrokenReceipts;
        impl ContractDeployer for BrokenReceipts {
            async fn submit_creation(&mut self, _init_code: Bytes) -> Result<B256> {
                Ok(B256::with_last_byte(1))
            }
            async fn creation_receipt(&self, _tx_hash: B256) -> Result<Option<TransactionReceipt>> {
                Err(anyhow::anyhow!("connection reset by peer").into())
            }
        }

        let pipeline = Pipeline::new(artifacts(), params(1, 1));
        let err = pipeline.run(&mut BrokenReceipts).await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::StageSubmission {
                stage: DeployStage::Token,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmined_transaction_times_out() {
        struct NeverMines;
        impl ContractDeployer for NeverMines {
            async fn submit_creation(&mut self, _init_code: Bytes) -> Result<B256> {
                Ok(B256::with_last_byte(1))
            }
            async fn creation_receipt(&self, _tx_hash: B256) -> Result<Option<TransactionReceipt>> {
                Ok(None)
            }
        }

        let pipeline = Pipeline::new(artifacts(), params(1, 1));
        let err = pipeline.run(&mut NeverMines).await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::StageConfirmationTimeout {
                stage: DeployStage::Token,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_threshold_bounds() {
        assert!(params(3, 1).validate().is_ok());
        assert!(params(3, 3).validate().is_ok());
        assert!(matches!(
            params(3, 0).validate(),
            Err(DeployError::InvalidMultisigParams(_))
        ));
        assert!(matches!(
            params(3, 4).validate(),
            Err(DeployError::InvalidMultisigParams(_))
        ));
    }

    #[test]
    fn test_validate_keeps_duplicate_owners() {
        // Deduplication is the contract's concern, not the pipeline's.
        let params = MultisigParams {
            owners: vec![Address::with_last_byte(1), Address::with_last_byte(1)],
            confirmations_required: 2,
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(DeployStage::Token.to_string(), "token");
        assert_eq!(DeployStage::Multisig.to_string(), "multisig");
        assert_eq!(DeployStage::Vesting.to_string(), "vesting");
    }
}
