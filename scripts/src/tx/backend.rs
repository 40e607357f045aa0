//! Chain operations a deployment needs

use alloy::{
    primitives::{Address, TxHash},
    rpc::types::eth::TransactionRequest,
};
use async_trait::async_trait;

use crate::errors::ScriptError;

/// A transaction that made it into a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinedTransaction {
    /// Hash of the transaction
    pub tx_hash: TxHash,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Address of the created contract, for contract creations
    pub contract_address: Option<Address>,
    /// Whether the transaction executed without reverting
    pub success: bool,
}

/// What the deploy scripts need from a chain connection
#[async_trait]
pub trait DeployBackend: Send + Sync {
    /// Address of the account sending the deployments
    fn deployer(&self) -> Address;

    /// Next nonce of the deployer
    async fn deployer_nonce(&self) -> Result<u64, ScriptError>;

    /// Sign and broadcast a contract creation, returning its hash
    async fn send_deployment(&self, tx: TransactionRequest) -> Result<TxHash, ScriptError>;

    /// Receipt of a transaction, `None` while it is pending
    async fn mined_transaction(&self, tx_hash: TxHash)
        -> Result<Option<MinedTransaction>, ScriptError>;

    /// Current head of the chain
    async fn block_number(&self) -> Result<u64, ScriptError>;
}
