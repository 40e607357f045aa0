//! Network and environment configuration, resolved once at start-up

use std::fmt::{self, Display, Formatter};

use alloy::primitives::Address;
use serde::Deserialize;

use crate::{
    constants::{DEVELOPMENT_CHAINS, DEVELOPMENT_CHAIN_ID, DEV_ACCOUNT_PRIVATE_KEY, LOCAL_RPC},
    errors::ScriptError,
};

/// Values read from the process environment (and `.env`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvConfig {
    /// RPC endpoint of the goerli testnet
    pub goerli_rpc_url: Option<String>,
    /// Private key of the deployer account
    pub private_key: Option<String>,
    /// API key of the block explorer, used for source verification
    pub etherscan_api_key: Option<String>,
    /// Price feed key, kept for parity with the gas reporter setup
    pub coinmarketcap_api_key: Option<String>,
    /// Address of the already deployed CryptoDevs NFT collection
    pub cryptodevs_nft_contract_address: Option<String>,
}

impl EnvConfig {
    /// Read the config from the current process environment
    pub fn from_env() -> Result<Self, ScriptError> {
        envy::from_env().map_err(|e| ScriptError::Config(e.to_string()))
    }

    /// Read the config from an explicit list of variables
    pub fn from_vars<I>(vars: I) -> Result<Self, ScriptError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars).map_err(|e| ScriptError::Config(e.to_string()))
    }

    /// Signing accounts configured for live networks. Empty if no key is set.
    pub fn accounts(&self) -> Vec<String> {
        non_empty(&self.private_key).into_iter().cloned().collect()
    }

    /// Explorer API key, if one is configured
    pub fn explorer_api_key(&self) -> Option<&str> {
        non_empty(&self.etherscan_api_key).map(String::as_str)
    }

    /// Parse the NFT collection address, if configured
    pub fn nft_address(&self) -> Result<Option<Address>, ScriptError> {
        non_empty(&self.cryptodevs_nft_contract_address)
            .map(|addr| {
                addr.parse::<Address>().map_err(|e| {
                    ScriptError::Config(format!("CRYPTODEVS_NFT_CONTRACT_ADDRESS: {e}"))
                })
            })
            .transpose()
    }
}

/// Treat empty variables (`PRIVATE_KEY=`) the same as missing ones
fn non_empty(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|v| !v.trim().is_empty())
}

/// A named network the scripts can deploy to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Name used on the command line
    pub name: String,
    /// Expected chain id of the RPC endpoint
    pub chain_id: u64,
    /// RPC endpoint, if one is configured
    pub url: Option<String>,
    /// Private keys usable on this network, the first one deploys
    pub accounts: Vec<String>,
    /// Confirmations the network considers final enough
    pub block_confirmations: u64,
    /// Whether this is a local development chain
    pub is_development: bool,
}

impl NetworkConfig {
    /// Resolve a network by name against the environment
    pub fn resolve(name: &str, env: &EnvConfig) -> Result<Self, ScriptError> {
        networks(env)
            .into_iter()
            .find(|network| network.name == name)
            .ok_or_else(|| {
                ScriptError::Config(format!(
                    "unknown network `{name}`, expected one of: {}",
                    network_names().join(", ")
                ))
            })
    }

    /// The RPC url, failing if the network has none configured
    pub fn rpc_url(&self) -> Result<&str, ScriptError> {
        self.url
            .as_deref()
            .ok_or_else(|| ScriptError::Config(format!("no RPC url set for {}", self.name)))
    }

    /// Key of the named `deployer` account (account index 0)
    pub fn deployer_key(&self) -> Result<&str, ScriptError> {
        self.accounts.first().map(String::as_str).ok_or_else(|| {
            ScriptError::Config(format!(
                "no deployer account on {}, set PRIVATE_KEY",
                self.name
            ))
        })
    }
}

impl Display for NetworkConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (chain {}, {} confirmations, {})",
            self.name,
            self.chain_id,
            self.block_confirmations,
            self.url.as_deref().unwrap_or("no url")
        )
    }
}

/// Whether `name` is one of the local development networks
pub fn is_development_chain(name: &str) -> bool {
    DEVELOPMENT_CHAINS.contains(&name)
}

/// Names of every configured network
pub fn network_names() -> Vec<&'static str> {
    vec!["hardhat", "localhost", "goerli"]
}

/// The network table
pub fn networks(env: &EnvConfig) -> Vec<NetworkConfig> {
    // Local chains fall back on the public development account
    let dev_accounts = match env.accounts() {
        accounts if accounts.is_empty() => vec![DEV_ACCOUNT_PRIVATE_KEY.to_string()],
        accounts => accounts,
    };

    vec![
        NetworkConfig {
            name: "hardhat".to_string(),
            chain_id: DEVELOPMENT_CHAIN_ID,
            url: Some(LOCAL_RPC.to_string()),
            accounts: dev_accounts.clone(),
            block_confirmations: 1,
            is_development: is_development_chain("hardhat"),
        },
        NetworkConfig {
            name: "localhost".to_string(),
            chain_id: DEVELOPMENT_CHAIN_ID,
            url: Some(LOCAL_RPC.to_string()),
            accounts: dev_accounts,
            block_confirmations: 1,
            is_development: is_development_chain("localhost"),
        },
        NetworkConfig {
            name: "goerli".to_string(),
            chain_id: 5,
            url: non_empty(&env.goerli_rpc_url).cloned(),
            accounts: env.accounts(),
            block_confirmations: 6,
            is_development: is_development_chain("goerli"),
        },
    ]
}
