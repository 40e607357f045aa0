//! Definitions of CLI arguments and commands for deploy scripts

use std::{path::PathBuf, time::Duration};

use alloy::primitives::Address;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::{
    artifacts::Artifacts,
    commands::{
        default_confirmations, deploy_contracts, deploy_dao, deploy_marketplace,
        explorer_verifier, parse_value, verify_contract, DaoParams, DeployContext,
    },
    config::{networks, EnvConfig, NetworkConfig},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_DAO_FUNDING,
        DEFAULT_DEPLOYMENTS_DIR, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_NETWORK, DEFAULT_POLL_INTERVAL,
        MARKETPLACE_CONTRACT,
    },
    errors::ScriptError,
    tx::ConfirmationPolicy,
};

/// Scripts for deploying & verifying the CryptoDevs DAO contracts
#[derive(Parser)]
pub struct Cli {
    /// Network to run against
    #[arg(short, long, global = true, default_value = DEFAULT_NETWORK)]
    pub network: String,

    /// Directory of the compiled contract artifacts
    #[arg(long, global = true, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// Directory the deployed addresses are recorded in
    #[arg(long, global = true, default_value = DEFAULT_DEPLOYMENTS_DIR)]
    pub deployments_dir: PathBuf,

    /// Explorer API endpoint, defaults to the network's Etherscan
    #[arg(long, global = true)]
    pub explorer_api_url: Option<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The possible CLI commands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy the marketplace, then the DAO
    Deploy(DeployArgs),
    /// Deploy only the marketplace
    DeployMarketplace(WaitArgs),
    /// Deploy only the DAO, against an existing marketplace
    DeployDao(DeployDaoArgs),
    /// Verify an already deployed contract
    Verify(VerifyArgs),
    /// List the configured networks
    Networks,
}

impl Cli {
    /// Run the command
    pub async fn run(self) -> Result<(), ScriptError> {
        let Cli {
            network,
            artifacts,
            deployments_dir,
            explorer_api_url,
            command,
        } = self;

        let env = EnvConfig::from_env()?;
        let network = NetworkConfig::resolve(&network, &env)?;
        let artifacts = Artifacts::new(artifacts);

        match command {
            Command::Deploy(args) => {
                info!("Deploying contracts on {}...", network);
                let params = args.dao.params(&env)?;
                let policy = args.wait.policy(&network);
                let ctx = DeployContext::connect(
                    network,
                    &env,
                    artifacts,
                    &deployments_dir,
                    explorer_api_url,
                    policy,
                )
                .await?;

                deploy_contracts(&ctx, &params).await?;
                Ok(())
            }
            Command::DeployMarketplace(wait) => {
                info!("Deploying the marketplace on {}...", network);
                let policy = wait.policy(&network);
                let ctx = DeployContext::connect(
                    network,
                    &env,
                    artifacts,
                    &deployments_dir,
                    explorer_api_url,
                    policy,
                )
                .await?;

                deploy_marketplace(&ctx).await?;
                Ok(())
            }
            Command::DeployDao(args) => {
                info!("Deploying the DAO on {}...", network);
                let params = args.dao.params(&env)?;
                let policy = args.wait.policy(&network);
                let ctx = DeployContext::connect(
                    network,
                    &env,
                    artifacts,
                    &deployments_dir,
                    explorer_api_url,
                    policy,
                )
                .await?;

                // Fall back on the marketplace of a previous run
                let marketplace = match args.marketplace {
                    Some(marketplace) => marketplace,
                    None => ctx.deployments.address_of(MARKETPLACE_CONTRACT)?.ok_or_else(|| {
                        ScriptError::Config(format!(
                            "no {} recorded in {}, pass --marketplace",
                            MARKETPLACE_CONTRACT,
                            ctx.deployments.path().display()
                        ))
                    })?,
                };

                deploy_dao(&ctx, marketplace, &params).await?;
                Ok(())
            }
            Command::Verify(args) => {
                let verifier = explorer_verifier(&network, &env, &artifacts, explorer_api_url)?
                    .ok_or_else(|| {
                        ScriptError::Config(format!(
                            "verification needs a live network and ETHERSCAN_API_KEY, got {}",
                            network.name
                        ))
                    })?;

                verify_contract(
                    verifier.as_ref(),
                    &artifacts,
                    &args.contract,
                    args.address,
                    &args.constructor_args,
                )
                .await?;
                Ok(())
            }
            Command::Networks => {
                for network in networks(&env) {
                    info!("{}", network);
                }
                Ok(())
            }
        }
    }
}

/// How long to wait for deployments
#[derive(Args)]
pub struct WaitArgs {
    /// Confirmations to wait for, defaults to 10 on live networks and to the
    /// network's own count on development chains
    #[arg(long)]
    pub confirmations: Option<u64>,
    /// Seconds before giving up on a confirmation wait
    #[arg(long, default_value_t = DEFAULT_CONFIRMATION_TIMEOUT.as_secs())]
    pub timeout: u64,
    /// Milliseconds between two confirmation polls
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    pub poll_interval: u64,
    /// Polls before giving up on a confirmation wait
    #[arg(long, default_value_t = DEFAULT_MAX_POLL_ATTEMPTS)]
    pub max_attempts: u32,
}

impl WaitArgs {
    /// Confirmation policy on the given network
    pub fn policy(&self, network: &NetworkConfig) -> ConfirmationPolicy {
        let confirmations = self
            .confirmations
            .unwrap_or_else(|| default_confirmations(network));

        ConfirmationPolicy::new(confirmations)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_poll_interval(Duration::from_millis(self.poll_interval))
            .with_max_attempts(self.max_attempts)
    }
}

/// DAO constructor parameters
#[derive(Args)]
pub struct DaoArgs {
    /// CryptoDevs NFT collection, defaults to CRYPTODEVS_NFT_CONTRACT_ADDRESS
    #[arg(long)]
    pub nft: Option<Address>,
    /// Extra address arguments appended to the DAO constructor
    #[arg(long = "extra-arg")]
    pub extra: Vec<Address>,
    /// Ether funding the DAO
    #[arg(long, default_value = DEFAULT_DAO_FUNDING)]
    pub value: String,
}

impl DaoArgs {
    /// Resolve the parameters against the environment
    pub fn params(&self, env: &EnvConfig) -> Result<DaoParams, ScriptError> {
        let nft = match self.nft {
            Some(nft) => nft,
            None => env.nft_address()?.ok_or_else(|| {
                ScriptError::Config(
                    "no NFT collection, pass --nft or set CRYPTODEVS_NFT_CONTRACT_ADDRESS"
                        .to_string(),
                )
            })?,
        };

        Ok(DaoParams {
            nft,
            extra: self.extra.clone(),
            value: parse_value(&self.value)?,
        })
    }
}

/// Deploy both contracts
#[derive(Args)]
pub struct DeployArgs {
    /// DAO constructor parameters
    #[command(flatten)]
    pub dao: DaoArgs,
    /// Confirmation wait settings
    #[command(flatten)]
    pub wait: WaitArgs,
}

/// Deploy the DAO alone
#[derive(Args)]
pub struct DeployDaoArgs {
    /// Marketplace the DAO trades on, defaults to the recorded deployment
    #[arg(long)]
    pub marketplace: Option<Address>,
    /// DAO constructor parameters
    #[command(flatten)]
    pub dao: DaoArgs,
    /// Confirmation wait settings
    #[command(flatten)]
    pub wait: WaitArgs,
}

/// Verify a deployed contract
#[derive(Args)]
pub struct VerifyArgs {
    /// Address of the deployed contract
    pub address: Address,
    /// Name of the contract artifact
    #[arg(short, long)]
    pub contract: String,
    /// Constructor arguments, in order
    #[arg(allow_hyphen_values = true)]
    pub constructor_args: Vec<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::missing_docs_in_private_items)]

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_deploy() {
        let cli = Cli::parse_from([
            "deploy-scripts",
            "--network",
            "goerli",
            "deploy",
            "--nft",
            "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512",
            "--extra-arg",
            "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0",
            "--value",
            "0.03",
        ]);
        assert_eq!(cli.network, "goerli");

        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        let params = args.dao.params(&EnvConfig::default()).unwrap();
        assert_eq!(params.extra.len(), 1);
        assert_eq!(params.value, parse_value("0.03").unwrap());

        let env = EnvConfig::default();
        let goerli = NetworkConfig::resolve("goerli", &env).unwrap();
        assert_eq!(args.wait.policy(&goerli).confirmations, 10);
    }

    #[test]
    fn nft_falls_back_on_env() {
        let cli = Cli::parse_from(["deploy-scripts", "deploy"]);
        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(cli.network, DEFAULT_NETWORK);

        assert!(args.dao.params(&EnvConfig::default()).is_err());
        let env = EnvConfig {
            cryptodevs_nft_contract_address: Some(
                "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".to_string(),
            ),
            ..Default::default()
        };
        let params = args.dao.params(&env).unwrap();
        assert_eq!(params.value, parse_value(DEFAULT_DAO_FUNDING).unwrap());
    }

    #[test]
    fn parses_verify() {
        let cli = Cli::parse_from([
            "deploy-scripts",
            "verify",
            "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "--contract",
            "CryptoDevsDAO",
            "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512",
            "42",
        ]);
        let Command::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        assert_eq!(args.contract, "CryptoDevsDAO");
        assert_eq!(args.constructor_args.len(), 2);
    }

    #[test]
    fn confirmations_can_be_overridden() {
        let cli = Cli::parse_from(["deploy-scripts", "deploy-marketplace", "--confirmations", "3"]);
        let Command::DeployMarketplace(wait) = cli.command else {
            panic!("expected deploy-marketplace");
        };
        let hardhat = NetworkConfig::resolve("hardhat", &EnvConfig::default()).unwrap();
        assert_eq!(wait.policy(&hardhat).confirmations, 3);
    }
}
