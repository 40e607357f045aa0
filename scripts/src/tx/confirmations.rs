//! Bounded wait for deployment confirmations

use std::time::Duration;

use alloy::primitives::TxHash;
use tracing::{debug, info};

use crate::{
    constants::{DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL},
    errors::ScriptError,
    tx::backend::{DeployBackend, MinedTransaction},
};

/// How long and how often to wait for a transaction to be confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Blocks, including the inclusion block, to wait for
    pub confirmations: u64,
    /// Delay between two polls
    pub poll_interval: Duration,
    /// Polls before giving up
    pub max_attempts: u32,
    /// Upper bound on the whole wait
    pub timeout: Duration,
}

impl ConfirmationPolicy {
    /// Wait for `confirmations` blocks with the default bounds
    pub fn new(confirmations: u64) -> Self {
        Self {
            confirmations,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }

    /// Set the delay between two polls
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the number of polls before giving up
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the upper bound on the whole wait
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Confirmations a transaction mined at `mined_at` has with `head` as latest block
pub fn confirmations_at(mined_at: u64, head: u64) -> u64 {
    (head + 1).saturating_sub(mined_at)
}

/// Wait until `tx_hash` is mined and buried under enough blocks.
///
/// Fails with [`ScriptError::ConfirmationTimeout`] once the attempts or the
/// timeout run out, and with [`ScriptError::ContractDeployment`] if the
/// transaction reverted. Dropping the returned future cancels the wait.
pub async fn wait_for_confirmations<B: DeployBackend + ?Sized>(
    backend: &B,
    tx_hash: TxHash,
    policy: &ConfirmationPolicy,
) -> Result<MinedTransaction, ScriptError> {
    info!(
        "Waiting for {} confirmations of {}...",
        policy.confirmations, tx_hash
    );

    tokio::time::timeout(policy.timeout, poll_confirmations(backend, tx_hash, policy))
        .await
        .map_err(|_| {
            ScriptError::ConfirmationTimeout(format!(
                "{} not confirmed after {}s",
                tx_hash,
                policy.timeout.as_secs()
            ))
        })?
}

/// The poll loop behind [`wait_for_confirmations`]
async fn poll_confirmations<B: DeployBackend + ?Sized>(
    backend: &B,
    tx_hash: TxHash,
    policy: &ConfirmationPolicy,
) -> Result<MinedTransaction, ScriptError> {
    let mut mined = None;

    for attempt in 1..=policy.max_attempts {
        // Look for the receipt until we have it, a reorg could still drop it
        // but we don't follow those
        if mined.is_none() {
            mined = backend.mined_transaction(tx_hash).await?;
            if let Some(tx) = &mined {
                if !tx.success {
                    return Err(ScriptError::ContractDeployment(format!(
                        "transaction {} reverted in block {}",
                        tx_hash, tx.block_number
                    )));
                }
                info!("Transaction {} mined in block {}", tx_hash, tx.block_number);
            }
        }

        if let Some(tx) = mined {
            let head = backend.block_number().await?;
            let confirmations = confirmations_at(tx.block_number, head);
            debug!(attempt, confirmations, "polled {}", tx_hash);
            if confirmations >= policy.confirmations {
                return Ok(tx);
            }
        } else {
            debug!(attempt, "{} still pending", tx_hash);
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.poll_interval).await;
        }
    }

    Err(ScriptError::ConfirmationTimeout(format!(
        "{} not confirmed after {} attempts",
        tx_hash, policy.max_attempts
    )))
}
