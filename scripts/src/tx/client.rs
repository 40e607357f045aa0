//! Signing RPC client of the deployer account

use alloy::{
    hex,
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{Address, TxHash, B256},
    providers::{
        fillers::{ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller},
        Identity, Provider, ProviderBuilder, ReqwestProvider,
    },
    rpc::types::eth::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::info;

use crate::{
    config::NetworkConfig,
    errors::ScriptError,
    tx::backend::{DeployBackend, MinedTransaction},
};

/// Re-export from alloy recommend filter
type RecommendFiller =
    JoinFill<JoinFill<JoinFill<Identity, GasFiller>, NonceFiller>, ChainIdFiller>;

/// An alloy provider that uses a local signer to generate signatures
/// & interfaces with the RPC endpoint over HTTP
pub type RpcProvider = FillProvider<
    JoinFill<RecommendFiller, WalletFiller<EthereumWallet>>,
    ReqwestProvider,
    alloy::transports::http::Http<Client>,
    Ethereum,
>;

/// Parse a hex private key, with or without `0x` prefix
pub fn parse_signer(private_key: &str) -> Result<PrivateKeySigner, ScriptError> {
    let bytes = hex::decode(private_key.trim())
        .map_err(|e| ScriptError::ClientInitialization(format!("invalid private key: {e}")))?;
    if bytes.len() != 32 {
        return Err(ScriptError::ClientInitialization(format!(
            "invalid private key: expected 32 bytes, got {}",
            bytes.len()
        )));
    }

    PrivateKeySigner::from_bytes(&B256::from_slice(&bytes))
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
}

/// A signing RPC client bound to one network
pub struct RpcClient {
    /// Provider with the deployer wallet
    provider: RpcProvider,
    /// Address of the deployer wallet
    deployer: Address,
}

impl RpcClient {
    /// Connect to the network RPC with its deployer account, checking the
    /// endpoint serves the expected chain.
    pub async fn connect(network: &NetworkConfig) -> Result<Self, ScriptError> {
        // Create our signer
        let signer = parse_signer(network.deployer_key()?)?;
        let deployer = signer.address();
        let wallet = EthereumWallet::from(signer);

        let url = network
            .rpc_url()?
            .parse::<Url>()
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

        // Create our provider with the rpc client + signer
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(url);

        // Fetch chain id
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        if chain_id != network.chain_id {
            return Err(ScriptError::ClientInitialization(format!(
                "{} expects chain id {}, the RPC serves {}",
                network.name, network.chain_id, chain_id
            )));
        }

        info!("Build client on chain ID: {}", chain_id);

        Ok(Self { provider, deployer })
    }
}

#[async_trait]
impl DeployBackend for RpcClient {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn deployer_nonce(&self) -> Result<u64, ScriptError> {
        self.provider
            .get_transaction_count(self.deployer)
            .await
            .map_err(|e| ScriptError::NonceFetching(e.to_string()))
    }

    async fn send_deployment(&self, tx: TransactionRequest) -> Result<TxHash, ScriptError> {
        let tx = tx.with_from(self.deployer);

        // Send it, the confirmation wait is handled by the caller
        let pending_tx = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

        Ok(*pending_tx.tx_hash())
    }

    async fn mined_transaction(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<MinedTransaction>, ScriptError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        // A receipt without block is still pending
        Ok(receipt.and_then(|receipt| {
            Some(MinedTransaction {
                tx_hash,
                block_number: receipt.block_number?,
                contract_address: receipt.contract_address,
                success: receipt.status(),
            })
        }))
    }

    async fn block_number(&self) -> Result<u64, ScriptError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::missing_docs_in_private_items)]

    use super::*;
    use crate::constants::DEV_ACCOUNT_PRIVATE_KEY;

    #[test]
    fn parses_dev_key() {
        let signer = parse_signer(DEV_ACCOUNT_PRIVATE_KEY).unwrap();
        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );

        // Prefixed keys are accepted too
        let prefixed = format!("0x{DEV_ACCOUNT_PRIVATE_KEY}");
        assert_eq!(parse_signer(&prefixed).unwrap().address(), signer.address());
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(matches!(
            parse_signer("not hex"),
            Err(ScriptError::ClientInitialization(_))
        ));
        assert!(matches!(
            parse_signer("abcd"),
            Err(ScriptError::ClientInitialization(_))
        ));
    }
}
