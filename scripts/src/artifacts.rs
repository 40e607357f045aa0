//! Lookup of compiled contract artifacts (hardhat `artifacts/` layout)

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy::{json_abi::JsonAbi, primitives::Bytes};
use serde::Deserialize;

use crate::errors::ScriptError;

/// A compiled contract, as written by the compiler
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    /// Name of the contract
    pub contract_name: String,
    /// Path of the solidity file, relative to the project root
    pub source_name: String,
    /// Contract ABI
    pub abi: JsonAbi,
    /// Creation bytecode
    pub bytecode: Bytes,
    /// Location of the artifact on disk
    #[serde(skip)]
    pub path: PathBuf,
}

impl ContractArtifact {
    /// Fully qualified name, `contracts/Foo.sol:Foo`
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Load the compiler build info this artifact was produced by
    pub fn build_info(&self) -> Result<BuildInfo, ScriptError> {
        let dbg_path = self.path.with_extension("dbg.json");
        let dbg: DebugFile = read_json(&dbg_path)?;

        // The debug file points to the build info relative to itself
        let build_info_path = dbg_path
            .parent()
            .map(|dir| dir.join(&dbg.build_info))
            .unwrap_or_else(|| PathBuf::from(&dbg.build_info));

        read_json(&build_info_path)
    }
}

/// `<Contract>.dbg.json`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    /// Build info path, relative to the debug file
    build_info: String,
}

/// Compiler input and version of a build, needed for source verification
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// Short compiler version, `0.8.10`
    pub solc_version: String,
    /// Full compiler version, `0.8.10+commit.fc410830`
    pub solc_long_version: String,
    /// Standard json input given to the compiler
    pub input: serde_json::Value,
}

/// The artifacts directory of a compiled project
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// Directory the lookups start from
    root: PathBuf,
}

impl Artifacts {
    /// Point at an artifacts directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The artifacts root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find and parse the artifact of the given contract
    pub fn load(&self, contract_name: &str) -> Result<ContractArtifact, ScriptError> {
        if !self.root.is_dir() {
            return Err(ScriptError::ArtifactParsing(format!(
                "artifacts directory {} not found, compile the contracts first",
                self.root.display()
            )));
        }

        let file_name = format!("{contract_name}.json");
        let mut found = Vec::new();
        find_files(&self.root, &file_name, &mut found)?;

        let path = match found.len() {
            0 => return Err(ScriptError::ArtifactNotFound(contract_name.to_string())),
            1 => found.remove(0),
            _ => {
                let paths: Vec<String> = found.iter().map(|p| p.display().to_string()).collect();
                return Err(ScriptError::ArtifactParsing(format!(
                    "{contract_name} is defined by several sources: {}",
                    paths.join(", ")
                )));
            }
        };

        let mut artifact: ContractArtifact = read_json(&path)?;
        artifact.path = path;

        if artifact.bytecode.is_empty() {
            return Err(ScriptError::ArtifactParsing(format!(
                "{contract_name} has no bytecode, is it abstract?"
            )));
        }

        Ok(artifact)
    }
}

/// Collect every file named `file_name` below `dir`, skipping the build info directory
fn find_files(dir: &Path, file_name: &str, found: &mut Vec<PathBuf>) -> Result<(), ScriptError> {
    let entries = fs::read_dir(dir).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

    let mut paths = entries
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
    // Stable order between runs
    paths.sort();

    for path in paths {
        if path.is_dir() {
            if !path.ends_with("build-info") {
                find_files(&path, file_name, found)?;
            }
        } else if path.file_name().is_some_and(|name| name == file_name) {
            found.push(path);
        }
    }

    Ok(())
}

/// Parses the JSON file at the given path
fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ScriptError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))?;

    serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))
}
