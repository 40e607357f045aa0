//! Source verification on a block explorer

use alloy::primitives::Address;
use async_trait::async_trait;
use tracing::{error, info};

use crate::{deploy::ConstructorArgs, errors::ScriptError};

mod etherscan;

pub use etherscan::EtherscanVerifier;

/// A contract to verify
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    /// Where the contract is deployed
    pub address: Address,
    /// Name of the contract artifact
    pub contract_name: String,
    /// Exact arguments the contract was deployed with
    pub constructor_args: ConstructorArgs,
}

/// What the explorer made of a verification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The source was accepted
    Verified,
    /// The source had been verified before
    AlreadyVerified,
    /// The explorer refused the source, or could not be reached
    Failed(String),
}

impl VerificationOutcome {
    /// Classify a free text failure from the explorer.
    ///
    /// Explorers report an existing verification as an error message, there
    /// is no status code for it.
    pub fn from_failure(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_already_verified(&message) {
            VerificationOutcome::AlreadyVerified
        } else {
            VerificationOutcome::Failed(message)
        }
    }
}

/// Whether an explorer message says the contract is already verified
pub fn is_already_verified(message: &str) -> bool {
    message.to_lowercase().contains("already verified")
}

/// Something able to verify contract sources
#[async_trait]
pub trait SourceVerifier: Send + Sync {
    /// Submit the request and wait for the explorer verdict
    async fn verify_source(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, ScriptError>;
}

/// Whether deployments on `network_is_development` should be verified
pub fn verification_enabled(network_is_development: bool, api_key: Option<&str>) -> bool {
    !network_is_development && api_key.is_some_and(|key| !key.is_empty())
}

/// Verify a deployed contract, logging the outcome.
///
/// Never fails: errors are logged and returned as
/// [`VerificationOutcome::Failed`] so a deployment is never undone by its
/// verification.
pub async fn verify(
    verifier: &dyn SourceVerifier,
    request: &VerificationRequest,
) -> VerificationOutcome {
    info!("Verifying the contract, please wait...");

    let outcome = match verifier.verify_source(request).await {
        Ok(outcome) => outcome,
        Err(e) => VerificationOutcome::from_failure(e.to_string()),
    };

    match &outcome {
        VerificationOutcome::Verified => {
            info!("{} verified at {}", request.contract_name, request.address)
        }
        VerificationOutcome::AlreadyVerified => info!("Already Verified"),
        VerificationOutcome::Failed(reason) => error!("{}", reason),
    }

    outcome
}
