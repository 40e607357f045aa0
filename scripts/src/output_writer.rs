//! Records of the deployed contracts, one JSON file per network

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy::primitives::Address;
use json::JsonValue;

use crate::{deploy::DeploymentRecord, errors::ScriptError};

/// The deployments file of one network, `<dir>/<network>.json`
#[derive(Debug, Clone)]
pub struct DeploymentsFile {
    /// Location of the JSON file
    path: PathBuf,
}

impl DeploymentsFile {
    /// Deployments file of `network` inside `dir`
    pub fn new(dir: impl AsRef<Path>, network: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{network}.json")),
        }
    }

    /// Where the file is written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the given deployment, replacing any previous one of the same contract
    pub fn write(&self, record: &DeploymentRecord) -> Result<(), ScriptError> {
        // If the file doesn't exist, create it
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| ScriptError::JsonOutputError(e.to_string()))?;
        }
        let mut parsed_json = if self.path.exists() {
            self.read()?
        } else {
            JsonValue::new_object()
        };

        let args: Vec<JsonValue> = record
            .constructor_args
            .raw()
            .iter()
            .map(|arg| JsonValue::from(arg.as_str()))
            .collect();

        // Update the right key
        let entry = &mut parsed_json[record.contract_name.as_str()];
        entry["address"] = record.address.to_string().into();
        entry["txHash"] = format!("{:#x}", record.tx_hash).into();
        entry["blockNumber"] = record.block_number.into();
        entry["args"] = JsonValue::Array(args);
        entry["value"] = record.value.to_string().into();

        // Write the updated json back to the file
        fs::write(&self.path, json::stringify_pretty(parsed_json, 4))
            .map_err(|e| ScriptError::JsonOutputError(e.to_string()))
    }

    /// Read back the address of a deployed contract, if recorded
    pub fn address_of(&self, contract_name: &str) -> Result<Option<Address>, ScriptError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let parsed_json = self.read()?;
        let Some(address) = parsed_json[contract_name]["address"].as_str() else {
            return Ok(None);
        };

        address
            .parse::<Address>()
            .map(Some)
            .map_err(|e| ScriptError::JsonOutputError(format!("{contract_name}: {e}")))
    }

    /// Parses the JSON file
    fn read(&self) -> Result<JsonValue, ScriptError> {
        let file_contents = fs::read_to_string(&self.path)
            .map_err(|e| ScriptError::JsonOutputError(e.to_string()))?;

        json::parse(&file_contents).map_err(|e| ScriptError::JsonOutputError(e.to_string()))
    }
}
