//! Deployment transactions built from compiled artifacts

use std::fmt::{self, Display, Formatter};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
    json_abi::{Constructor, StateMutability},
    network::TransactionBuilder,
    primitives::{Bytes, U256},
    rpc::types::eth::TransactionRequest,
};

use crate::{artifacts::ContractArtifact, errors::ScriptError};

/// Ordered constructor arguments, as given by the operator and as typed by the ABI.
///
/// The same value is used to build the deployment transaction and the
/// verification request, so both always agree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorArgs {
    /// Arguments as given by the caller
    raw: Vec<String>,
    /// Arguments coerced to the constructor types
    values: Vec<DynSolValue>,
}

impl ConstructorArgs {
    /// No arguments
    pub fn empty() -> Self {
        Self {
            raw: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Coerce raw string values into the types of the constructor inputs
    pub fn parse<S: AsRef<str>>(
        constructor: Option<&Constructor>,
        raw: &[S],
    ) -> Result<Self, ScriptError> {
        let inputs = constructor.map(|c| c.inputs.as_slice()).unwrap_or_default();
        if inputs.len() != raw.len() {
            return Err(ScriptError::ConstructorArgs(format!(
                "expected {} arguments, got {}",
                inputs.len(),
                raw.len()
            )));
        }

        let values = inputs
            .iter()
            .zip(raw)
            .map(|(param, value)| {
                let ty = param
                    .resolve()
                    .map_err(|e| ScriptError::ConstructorArgs(e.to_string()))?;
                ty.coerce_str(value.as_ref()).map_err(|e| {
                    ScriptError::ConstructorArgs(format!("`{}` for {}: {e}", value.as_ref(), param.name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.iter().map(|v| v.as_ref().to_string()).collect(),
            values,
        })
    }

    /// Arguments as given
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    /// Arguments as ABI values
    pub fn values(&self) -> &[DynSolValue] {
        &self.values
    }

    /// Whether the constructor takes no argument
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl Display for ConstructorArgs {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.raw.join(", "))
    }
}

/// A deployable handle on a compiled contract
#[derive(Debug, Clone)]
pub struct ContractFactory {
    /// Contract deployed by this factory
    artifact: ContractArtifact,
}

impl ContractFactory {
    /// Factory for the given artifact
    pub fn new(artifact: ContractArtifact) -> Self {
        Self { artifact }
    }

    /// Name of the contract this factory deploys
    pub fn name(&self) -> &str {
        &self.artifact.contract_name
    }

    /// The compiled contract
    pub fn artifact(&self) -> &ContractArtifact {
        &self.artifact
    }

    /// Type the given raw values against this contract constructor
    pub fn constructor_args<S: AsRef<str>>(&self, raw: &[S]) -> Result<ConstructorArgs, ScriptError> {
        ConstructorArgs::parse(self.artifact.abi.constructor(), raw)
    }

    /// ABI encoding of the constructor arguments, without the bytecode
    pub fn encode_constructor_args(&self, args: &ConstructorArgs) -> Result<Bytes, ScriptError> {
        match (self.artifact.abi.constructor(), args.is_empty()) {
            (None, false) => Err(ScriptError::ConstructorArgs(format!(
                "{} has no constructor",
                self.name()
            ))),
            (None, true) => Ok(Bytes::new()),
            (Some(constructor), _) => constructor
                .abi_encode_input(args.values())
                .map(Bytes::from)
                .map_err(|e| ScriptError::ConstructorArgs(e.to_string())),
        }
    }

    /// Build the contract creation transaction
    pub fn deploy_tx(
        &self,
        args: &ConstructorArgs,
        value: U256,
    ) -> Result<TransactionRequest, ScriptError> {
        // Only payable constructors can receive funds
        let payable = self
            .artifact
            .abi
            .constructor()
            .is_some_and(|c| c.state_mutability == StateMutability::Payable);
        if !value.is_zero() && !payable {
            return Err(ScriptError::ConstructorArgs(format!(
                "{} constructor is not payable",
                self.name()
            )));
        }

        // Concatenate the bytecode and abi-encoded constructor call
        let input = self.encode_constructor_args(args)?;
        let code: Bytes = self
            .artifact
            .bytecode
            .iter()
            .copied()
            .chain(input)
            .collect();

        Ok(TransactionRequest::default()
            .with_deploy_code(code)
            .with_value(value))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::missing_docs_in_private_items)]

    use alloy::primitives::{address, Address, TxKind};

    use super::*;
    use crate::artifacts::{
        tests::{write_artifact, DAO_ABI, MARKETPLACE_ABI},
        Artifacts,
    };

    fn factory(name: &str, abi: &str) -> ContractFactory {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), name, abi, "0x6080");
        ContractFactory::new(Artifacts::new(dir.path()).load(name).unwrap())
    }

    const MARKETPLACE: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
    const NFT: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");
    const COMMUNITY: Address = address!("9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");

    #[test]
    fn typed_args_keep_order() {
        let dao = factory("CryptoDevsDAO", DAO_ABI);
        let raw = [MARKETPLACE, NFT, COMMUNITY].map(|a| a.to_string());

        let args = dao.constructor_args(&raw).unwrap();
        assert_eq!(args.raw(), raw.as_slice());
        assert_eq!(
            args.values(),
            &[
                DynSolValue::Address(MARKETPLACE),
                DynSolValue::Address(NFT),
                DynSolValue::Address(COMMUNITY),
            ]
        );
    }

    #[test]
    fn rejects_wrong_arity_and_types() {
        let dao = factory("CryptoDevsDAO", DAO_ABI);
        assert!(matches!(
            dao.constructor_args(&[MARKETPLACE.to_string()]),
            Err(ScriptError::ConstructorArgs(_))
        ));
        assert!(matches!(
            dao.constructor_args(&["a", "b", "c"]),
            Err(ScriptError::ConstructorArgs(_))
        ));

        let marketplace = factory("FakeNFTMarketplace", MARKETPLACE_ABI);
        assert!(marketplace.constructor_args(&["1"]).is_err());
        assert!(marketplace.constructor_args::<&str>(&[]).unwrap().is_empty());
    }

    #[test]
    fn deploy_tx_appends_encoded_args() {
        let dao = factory("CryptoDevsDAO", DAO_ABI);
        let raw = [MARKETPLACE, NFT, COMMUNITY].map(|a| a.to_string());
        let args = dao.constructor_args(&raw).unwrap();

        let tx = dao.deploy_tx(&args, U256::from(7)).unwrap();
        assert_eq!(tx.to, Some(TxKind::Create));
        assert_eq!(tx.value, Some(U256::from(7)));

        let input = tx.input.input().unwrap();
        assert_eq!(&input[..2], &[0x60, 0x80]);
        assert_eq!(input.len(), 2 + 3 * 32);
        assert_eq!(&input[2 + 12..2 + 32], MARKETPLACE.as_slice());
        assert_eq!(&input[2..], dao.encode_constructor_args(&args).unwrap().as_ref());
    }

    #[test]
    fn value_needs_payable_constructor() {
        let marketplace = factory("FakeNFTMarketplace", MARKETPLACE_ABI);
        let args = ConstructorArgs::empty();
        assert!(marketplace.deploy_tx(&args, U256::ZERO).is_ok());
        assert!(matches!(
            marketplace.deploy_tx(&args, U256::from(1)),
            Err(ScriptError::ConstructorArgs(_))
        ));
    }
}
