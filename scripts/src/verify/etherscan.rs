//! Etherscan source verification client

use std::time::Duration;

use alloy::hex;
use async_trait::async_trait;
use ethers::types::Chain;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    artifacts::Artifacts,
    deploy::ContractFactory,
    errors::ScriptError,
    verify::{SourceVerifier, VerificationOutcome, VerificationRequest},
};

/// Code format of a standard json input submission
const STANDARD_JSON_INPUT: &str = "solidity-standard-json-input";

/// Raw answer of the explorer API
#[derive(Debug, Clone, Deserialize)]
struct EtherscanResponse {
    /// `"1"` on success, `"0"` otherwise
    status: String,
    /// Short status text, `OK` or `NOTOK`
    #[allow(dead_code)]
    message: String,
    /// Guid, verdict or error message
    result: String,
}

/// What to do after a submission
#[derive(Debug, PartialEq, Eq)]
enum Submission {
    /// Accepted, poll the given guid
    Queued(String),
    /// The explorer hasn't indexed the contract yet, submit again
    NotIndexed,
    /// Final answer, nothing to poll
    Done(VerificationOutcome),
}

/// Interpret the answer to a `verifysourcecode` call
fn submission_outcome(response: EtherscanResponse) -> Submission {
    if response.status == "1" {
        return Submission::Queued(response.result);
    }
    if response.result.contains("Unable to locate ContractCode") {
        return Submission::NotIndexed;
    }
    Submission::Done(VerificationOutcome::from_failure(response.result))
}

/// Interpret the answer to a `checkverifystatus` call, `None` while pending
fn status_outcome(response: EtherscanResponse) -> Option<VerificationOutcome> {
    if response.result.contains("Pending in queue") {
        return None;
    }
    if response.status == "1" {
        return Some(VerificationOutcome::Verified);
    }
    Some(VerificationOutcome::from_failure(response.result))
}

/// Explorer API endpoint of a chain
pub fn explorer_api_url(chain_id: u64) -> Option<&'static str> {
    Chain::try_from(chain_id)
        .ok()
        .and_then(|chain| chain.etherscan_urls())
        .map(|(api, _browser)| api)
}

/// Verifies sources through an Etherscan compatible API
pub struct EtherscanVerifier {
    /// Http client
    client: Client,
    /// API endpoint
    api_url: String,
    /// API key sent with every call
    api_key: String,
    /// Where the verified contracts were compiled
    artifacts: Artifacts,
    /// Attempts for both the submission and the status polling
    retries: u32,
    /// Delay between two attempts
    delay: Duration,
}

impl EtherscanVerifier {
    /// Build a verifier talking to the given API endpoint
    pub fn new(api_url: impl Into<String>, api_key: &str, artifacts: Artifacts) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into(),
            api_key: api_key.to_string(),
            artifacts,
            retries: 10,
            delay: Duration::from_secs(5),
        }
    }

    /// Build a verifier for the explorer of `chain_id`
    pub fn for_chain(
        chain_id: u64,
        api_key: &str,
        artifacts: Artifacts,
    ) -> Result<Self, ScriptError> {
        let api_url = explorer_api_url(chain_id).ok_or_else(|| {
            ScriptError::Verification(format!("no known explorer for chain {chain_id}"))
        })?;

        Ok(Self::new(api_url, api_key, artifacts))
    }

    /// Form fields of a verification submission
    fn submission_form(
        &self,
        request: &VerificationRequest,
    ) -> Result<Vec<(&'static str, String)>, ScriptError> {
        let artifact = self.artifacts.load(&request.contract_name)?;
        let build_info = artifact.build_info()?;
        let qualified_name = artifact.qualified_name();

        // Same encoding as the deployment used
        let factory = ContractFactory::new(artifact);
        let encoded_args = factory.encode_constructor_args(&request.constructor_args)?;

        let source = serde_json::to_string(&build_info.input)
            .map_err(|e| ScriptError::Verification(e.to_string()))?;

        Ok(vec![
            ("apikey", self.api_key.clone()),
            ("module", "contract".to_string()),
            ("action", "verifysourcecode".to_string()),
            ("contractaddress", request.address.to_string()),
            ("sourceCode", source),
            ("codeformat", STANDARD_JSON_INPUT.to_string()),
            ("contractname", qualified_name),
            (
                "compilerversion",
                format!("v{}", build_info.solc_long_version),
            ),
            // Misspelled on the explorer side
            ("constructorArguements", hex::encode(encoded_args)),
        ])
    }

    /// POST a form to the API and parse the answer
    async fn post(&self, form: &[(&'static str, String)]) -> Result<EtherscanResponse, ScriptError> {
        self.send(self.client.post(&self.api_url).form(form)).await
    }

    /// GET a query from the API and parse the answer
    async fn get(&self, query: &[(&'static str, String)]) -> Result<EtherscanResponse, ScriptError> {
        self.send(self.client.get(&self.api_url).query(query)).await
    }

    /// Send a request and parse the explorer answer
    async fn send(&self, request: RequestBuilder) -> Result<EtherscanResponse, ScriptError> {
        let body = request
            .send()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?
            .text()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            ScriptError::Verification(format!("unexpected explorer answer `{body}`: {e}"))
        })
    }

    /// Submit the source, retrying while the explorer hasn't indexed the contract
    async fn submit(&self, request: &VerificationRequest) -> Result<Submission, ScriptError> {
        let form = self.submission_form(request)?;

        for attempt in 1..=self.retries {
            match submission_outcome(self.post(&form).await?) {
                Submission::NotIndexed if attempt < self.retries => {
                    info!(
                        "Waiting for the explorer to detect {}... ({}/{})",
                        request.address, attempt, self.retries
                    );
                    tokio::time::sleep(self.delay).await;
                }
                Submission::NotIndexed => {
                    return Ok(Submission::Done(VerificationOutcome::Failed(format!(
                        "explorer never indexed {}",
                        request.address
                    ))))
                }
                submission => return Ok(submission),
            }
        }

        Err(ScriptError::Verification("no submission attempt made".to_string()))
    }

    /// Poll the verification status of a submission
    async fn check_status(&self, guid: &str) -> Result<VerificationOutcome, ScriptError> {
        let query = vec![
            ("apikey", self.api_key.clone()),
            ("module", "contract".to_string()),
            ("action", "checkverifystatus".to_string()),
            ("guid", guid.to_string()),
        ];

        for attempt in 1..=self.retries {
            tokio::time::sleep(self.delay).await;
            match status_outcome(self.get(&query).await?) {
                Some(outcome) => return Ok(outcome),
                None => debug!(attempt, "verification {} pending", guid),
            }
        }

        warn!("Verification {} still pending, check it on the explorer", guid);
        Ok(VerificationOutcome::Failed(format!(
            "verification {guid} still pending after {} checks",
            self.retries
        )))
    }
}

#[async_trait]
impl SourceVerifier for EtherscanVerifier {
    async fn verify_source(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, ScriptError> {
        match self.submit(request).await? {
            Submission::Queued(guid) => {
                info!("Verification submitted, guid {}", guid);
                self.check_status(&guid).await
            }
            Submission::Done(outcome) => Ok(outcome),
            Submission::NotIndexed => Ok(VerificationOutcome::Failed(format!(
                "explorer never indexed {}",
                request.address
            ))),
        }
    }
}
