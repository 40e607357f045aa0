//! Sending a deployment and waiting for it to land

use alloy::primitives::{keccak256, Address, TxHash, U256};
use ethers::{prelude::U256 as EthersU256, utils::rlp};
use tracing::info;

use crate::{
    deploy::factory::{ConstructorArgs, ContractFactory},
    errors::ScriptError,
    tx::{confirmations::wait_for_confirmations, ConfirmationPolicy, DeployBackend},
};

/// Result of a confirmed deployment
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRecord {
    /// Name of the deployed contract
    pub contract_name: String,
    /// Address the contract lives at
    pub address: Address,
    /// Arguments given to the constructor
    pub constructor_args: ConstructorArgs,
    /// Wei sent along the creation
    pub value: U256,
    /// Creation transaction
    pub tx_hash: TxHash,
    /// Block the creation was included in
    pub block_number: u64,
}

/// Deploy a compiled contract and wait for its confirmations
pub async fn deploy_contract<B: DeployBackend + ?Sized>(
    backend: &B,
    factory: &ContractFactory,
    constructor_args: ConstructorArgs,
    value: U256,
    policy: &ConfirmationPolicy,
) -> Result<DeploymentRecord, ScriptError> {
    // Build the creation tx first, bad arguments shouldn't cost a nonce lookup
    let tx_request = factory.deploy_tx(&constructor_args, value)?;

    // Predict the contract address
    let nonce = backend.deployer_nonce().await?;
    let predicted = predict_contract_address(backend.deployer(), nonce);
    info!(
        "Deploying {} from {} (expected at {}) with args {}",
        factory.name(),
        backend.deployer(),
        predicted,
        constructor_args
    );

    // Send it
    let tx_hash = backend.send_deployment(tx_request).await?;
    info!("Pending deployment transaction... {}", tx_hash);

    // Wait for the transaction to be buried deep enough
    let mined = wait_for_confirmations(backend, tx_hash, policy).await?;
    let address = mined.contract_address.ok_or_else(|| {
        ScriptError::ContractDeployment(format!("{} created no contract", tx_hash))
    })?;

    Ok(DeploymentRecord {
        contract_name: factory.name().to_string(),
        address,
        constructor_args,
        value,
        tx_hash,
        block_number: mined.block_number,
    })
}

/// Predict the address of a contract created by `deployer` at `nonce`,
/// `keccak256(rlp([deployer, nonce]))[12..]`
pub fn predict_contract_address(deployer: Address, nonce: u64) -> Address {
    // Ethers RLP
    let mut stream = rlp::RlpStream::new();
    stream.begin_list(2);
    stream.append(&deployer.to_vec());
    stream.append(&EthersU256::from(nonce));
    let hash = keccak256(stream.out());

    Address::from_slice(&hash[12..])
}
