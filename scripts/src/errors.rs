//! Definitions of errors that can occur during the execution of the deployment scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deployment scripts
#[derive(Debug)]
pub enum ScriptError {
    /// Error when resolving the network or environment configuration
    Config(String),
    /// Error when reading or writing the deployments file
    JsonOutputError(String),
    /// Error when creating the client
    ClientInitialization(String),
    /// Error when fetching the nonce to deploy a contract
    NonceFetching(String),
    /// No compiled artifact matches the requested contract name
    ArtifactNotFound(String),
    /// A compiled artifact exists but can't be read
    ArtifactParsing(String),
    /// Constructor arguments don't match the contract constructor
    ConstructorArgs(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// The deployment was not confirmed in time
    ConfirmationTimeout(String),
    /// Error reading chain state
    ContractInteraction(String),
    /// Error talking to the block explorer
    Verification(String),
    /// The run was interrupted by the operator
    Cancelled,
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Config(s) => write!(f, "invalid configuration: {}", s),
            ScriptError::JsonOutputError(s) => write!(f, "error writing json output: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error during client init: {}", s),
            ScriptError::NonceFetching(s) => {
                write!(f, "error during nonce fetching for client signing: {}", s)
            }
            ScriptError::ArtifactNotFound(s) => write!(f, "no compiled artifact for contract {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error reading contract artifact: {}", s),
            ScriptError::ConstructorArgs(s) => write!(f, "invalid constructor arguments: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ConfirmationTimeout(s) => {
                write!(f, "timed out waiting for confirmations: {}", s)
            }
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::Verification(s) => write!(f, "error verifying contract: {}", s),
            ScriptError::Cancelled => write!(f, "interrupted"),
        }
    }
}

impl Error for ScriptError {}
