//! Constants used in the deploy scripts

use std::time::Duration;

/// Network used when none is given on the command line
pub const DEFAULT_NETWORK: &str = "hardhat";

/// Networks that are run locally; never verified on an explorer
pub const DEVELOPMENT_CHAINS: &[&str] = &["hardhat", "localhost"];

/// Chain id shared by the local development networks
pub const DEVELOPMENT_CHAIN_ID: u64 = 31337;

/// Default RPC endpoint of a local development node
pub const LOCAL_RPC: &str = "http://127.0.0.1:8545/";

/// Account #0 of the well known hardhat / anvil development mnemonic
pub const DEV_ACCOUNT_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Confirmations awaited after each deployment on a live network
pub const DEPLOY_CONFIRMATIONS: u64 = 10;

/// Default upper bound for a confirmation wait
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(600);

/// Default delay between two confirmation polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Default number of polls before giving up on a confirmation wait
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 150;

/// Name of the marketplace contract artifact
pub const MARKETPLACE_CONTRACT: &str = "FakeNFTMarketplace";

/// Name of the DAO contract artifact
pub const DAO_CONTRACT: &str = "CryptoDevsDAO";

/// Ether sent to the DAO constructor when none is specified
pub const DEFAULT_DAO_FUNDING: &str = "0.05";

/// Default location of the compiled contract artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Default location of the deployments records
pub const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";
