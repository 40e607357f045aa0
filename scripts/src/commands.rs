//! The deployment flows behind each CLI command

use std::{path::Path, sync::Arc};

use alloy::primitives::{utils::parse_ether, Address, U256};
use tracing::info;

use crate::{
    artifacts::Artifacts,
    config::{EnvConfig, NetworkConfig},
    constants::{DAO_CONTRACT, DEPLOY_CONFIRMATIONS, MARKETPLACE_CONTRACT},
    deploy::{deploy_contract, ContractFactory, DeploymentRecord},
    errors::ScriptError,
    output_writer::DeploymentsFile,
    tx::{ConfirmationPolicy, DeployBackend, RpcClient},
    verify::{
        verification_enabled, verify, EtherscanVerifier, SourceVerifier, VerificationOutcome,
        VerificationRequest,
    },
};

/// Parse a decimal ether amount (`"0.05"`) into wei
pub fn parse_value(value: &str) -> Result<U256, ScriptError> {
    parse_ether(value).map_err(|e| ScriptError::Config(format!("invalid ether amount {value}: {e}")))
}

/// Confirmations to wait for on `network`, unless overridden.
///
/// Live networks use the fixed deploy script count, local chains only mine
/// on demand and use their own (single) confirmation.
pub fn default_confirmations(network: &NetworkConfig) -> u64 {
    if network.is_development {
        network.block_confirmations
    } else {
        DEPLOY_CONFIRMATIONS
    }
}

/// The explorer verifier for `network`, if verification applies there
pub fn explorer_verifier(
    network: &NetworkConfig,
    env: &EnvConfig,
    artifacts: &Artifacts,
    api_url: Option<String>,
) -> Result<Option<Arc<dyn SourceVerifier>>, ScriptError> {
    let api_key = match env.explorer_api_key() {
        Some(key) if verification_enabled(network.is_development, Some(key)) => key,
        _ => {
            info!("Contract verification disabled on {}", network.name);
            return Ok(None);
        }
    };

    let verifier = match api_url {
        Some(api_url) => EtherscanVerifier::new(api_url, api_key, artifacts.clone()),
        None => EtherscanVerifier::for_chain(network.chain_id, api_key, artifacts.clone())?,
    };

    Ok(Some(Arc::new(verifier)))
}

/// Constructor parameters of the DAO besides the marketplace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaoParams {
    /// The CryptoDevs NFT collection
    pub nft: Address,
    /// Trailing address arguments of the DAO constructor
    pub extra: Vec<Address>,
    /// Wei funding the DAO treasury
    pub value: U256,
}

impl DaoParams {
    /// Ordered constructor arguments for a DAO bound to `marketplace`
    pub fn constructor_args(&self, marketplace: Address) -> Vec<String> {
        [marketplace, self.nft]
            .iter()
            .chain(&self.extra)
            .map(|address| address.to_string())
            .collect()
    }
}

/// Everything a deployment run needs, built once per process
pub struct DeployContext {
    /// Network deployed to
    pub network: NetworkConfig,
    /// Where the compiled contracts live
    pub artifacts: Artifacts,
    /// Chain access, signing as the deployer
    pub backend: Arc<dyn DeployBackend>,
    /// Explorer verifier, `None` when verification is off
    pub verifier: Option<Arc<dyn SourceVerifier>>,
    /// How long to wait for each deployment
    pub policy: ConfirmationPolicy,
    /// Record of the deployed addresses
    pub deployments: DeploymentsFile,
}

impl DeployContext {
    /// Connect to the network and set up verification
    pub async fn connect(
        network: NetworkConfig,
        env: &EnvConfig,
        artifacts: Artifacts,
        deployments_dir: &Path,
        explorer_api_url: Option<String>,
        policy: ConfirmationPolicy,
    ) -> Result<Self, ScriptError> {
        // Build our RPC client with signer
        let backend = Arc::new(RpcClient::connect(&network).await?);
        let verifier = explorer_verifier(&network, env, &artifacts, explorer_api_url)?;
        let deployments = DeploymentsFile::new(deployments_dir, &network.name);

        Ok(Self {
            network,
            artifacts,
            backend,
            verifier,
            policy,
            deployments,
        })
    }

    /// Resolve a contract factory by name
    pub fn factory(&self, contract_name: &str) -> Result<ContractFactory, ScriptError> {
        self.artifacts.load(contract_name).map(ContractFactory::new)
    }

    /// Deploy, record and verify one contract
    pub async fn publish(
        &self,
        contract_name: &str,
        raw_args: &[String],
        value: U256,
    ) -> Result<DeploymentRecord, ScriptError> {
        let factory = self.factory(contract_name)?;
        let constructor_args = factory.constructor_args(raw_args)?;

        let record = deploy_contract(
            self.backend.as_ref(),
            &factory,
            constructor_args,
            value,
            &self.policy,
        )
        .await?;

        info!("{} deployed to: {}", record.contract_name, record.address);
        info!("------------------------------");

        // Record it before anything else can fail
        self.deployments.write(&record)?;

        self.verify_deployment(&record).await;

        Ok(record)
    }

    /// Verify a fresh deployment with the arguments it was deployed with.
    /// `None` if verification does not apply to this network.
    pub async fn verify_deployment(
        &self,
        record: &DeploymentRecord,
    ) -> Option<VerificationOutcome> {
        if self.network.is_development {
            return None;
        }
        let verifier = self.verifier.as_ref()?;

        let request = VerificationRequest {
            address: record.address,
            contract_name: record.contract_name.clone(),
            constructor_args: record.constructor_args.clone(),
        };
        Some(verify(verifier.as_ref(), &request).await)
    }
}

/// Deploy the FakeNFTMarketplace contract
pub async fn deploy_marketplace(ctx: &DeployContext) -> Result<DeploymentRecord, ScriptError> {
    info!("Deploying {}", MARKETPLACE_CONTRACT);
    ctx.publish(MARKETPLACE_CONTRACT, &[], U256::ZERO).await
}

/// Deploy the CryptoDevsDAO contract, funded with `params.value`
pub async fn deploy_dao(
    ctx: &DeployContext,
    marketplace: Address,
    params: &DaoParams,
) -> Result<DeploymentRecord, ScriptError> {
    info!("Deploying {}", DAO_CONTRACT);
    ctx.publish(DAO_CONTRACT, &params.constructor_args(marketplace), params.value)
        .await
}

/// Deploy the marketplace, then the DAO pointing at it
pub async fn deploy_contracts(
    ctx: &DeployContext,
    params: &DaoParams,
) -> Result<(DeploymentRecord, DeploymentRecord), ScriptError> {
    let marketplace = deploy_marketplace(ctx).await?;
    let dao = deploy_dao(ctx, marketplace.address, params).await?;

    Ok((marketplace, dao))
}

/// Verify an already deployed contract
pub async fn verify_contract(
    verifier: &dyn SourceVerifier,
    artifacts: &Artifacts,
    contract_name: &str,
    address: Address,
    raw_args: &[String],
) -> Result<VerificationOutcome, ScriptError> {
    let factory = ContractFactory::new(artifacts.load(contract_name)?);
    let constructor_args = factory.constructor_args(raw_args)?;

    let request = VerificationRequest {
        address,
        contract_name: contract_name.to_string(),
        constructor_args,
    };
    Ok(verify(verifier, &request).await)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::missing_docs_in_private_items)]

    use std::time::Duration;

    use alloy::{
        dyn_abi::{DynSolValue, JsonAbiExt},
        primitives::address,
    };

    use super::*;
    use crate::{
        artifacts::tests::{write_artifact, DAO_ABI, MARKETPLACE_ABI},
        tx::confirmations::tests::MockChain,
        verify::tests::MockVerifier,
    };

    const NFT: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");
    const COMMUNITY: Address = address!("9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");

    struct Harness {
        _dir: tempfile::TempDir,
        chain: Arc<MockChain>,
        verifier: Arc<MockVerifier>,
        ctx: DeployContext,
    }

    fn harness(network: &str, contracts: &[(&str, &str)]) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let artifacts_dir = dir.path().join("artifacts");
        for (name, abi) in contracts {
            write_artifact(&artifacts_dir, name, abi, "0x6080");
        }

        let chain = Arc::new(MockChain::new());
        let verifier = Arc::new(MockVerifier::answering(Ok(VerificationOutcome::Verified)));
        let network = NetworkConfig::resolve(network, &EnvConfig::default()).unwrap();
        let ctx = DeployContext {
            deployments: DeploymentsFile::new(dir.path().join("deployments"), &network.name),
            network,
            artifacts: Artifacts::new(artifacts_dir),
            backend: chain.clone(),
            verifier: Some(verifier.clone()),
            policy: ConfirmationPolicy::new(3)
                .with_poll_interval(Duration::from_millis(1))
                .with_max_attempts(20),
        };

        Harness {
            _dir: dir,
            chain,
            verifier,
            ctx,
        }
    }

    const BOTH: &[(&str, &str)] = &[
        (MARKETPLACE_CONTRACT, MARKETPLACE_ABI),
        (DAO_CONTRACT, DAO_ABI),
    ];

    #[tokio::test]
    async fn dao_is_deployed_and_verified_with_the_same_args() {
        let h = harness("goerli", BOTH);
        let marketplace = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
        let params = DaoParams {
            nft: NFT,
            extra: vec![COMMUNITY],
            value: parse_value("0.03").unwrap(),
        };

        let record = deploy_dao(&h.ctx, marketplace, &params).await.unwrap();

        // A single creation with the args in order
        let sent = h.chain.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].value, Some(U256::from(30_000_000_000_000_000u64)));
        let input = sent[0].input.input().unwrap();
        let factory = h.ctx.factory(DAO_CONTRACT).unwrap();
        let constructor = factory.artifact().abi.constructor().unwrap();
        let decoded = constructor.abi_decode_input(&input[2..], true).unwrap();
        assert_eq!(
            decoded,
            vec![
                DynSolValue::Address(marketplace),
                DynSolValue::Address(NFT),
                DynSolValue::Address(COMMUNITY),
            ]
        );

        // The same list reaches the explorer
        let expected_raw: Vec<String> = [marketplace, NFT, COMMUNITY]
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(record.constructor_args.raw(), expected_raw.as_slice());
        assert_eq!(
            h.verifier.requests(),
            vec![VerificationRequest {
                address: record.address,
                contract_name: DAO_CONTRACT.to_string(),
                constructor_args: record.constructor_args.clone(),
            }]
        );
    }

    #[tokio::test]
    async fn development_chains_are_never_verified() {
        let h = harness("localhost", BOTH);
        let params = DaoParams {
            nft: NFT,
            extra: vec![COMMUNITY],
            value: parse_value("0.05").unwrap(),
        };

        let (marketplace, dao) = deploy_contracts(&h.ctx, &params).await.unwrap();

        assert!(h.verifier.requests().is_empty());
        assert_eq!(h.ctx.verify_deployment(&dao).await, None);
        assert_eq!(h.chain.sent().len(), 2);
        assert_eq!(dao.constructor_args.raw()[0], marketplace.address.to_string());
    }

    #[tokio::test]
    async fn each_deployment_is_verified_once() {
        let h = harness("goerli", BOTH);
        let params = DaoParams {
            nft: NFT,
            extra: vec![COMMUNITY],
            value: U256::ZERO,
        };

        let (marketplace, dao) = deploy_contracts(&h.ctx, &params).await.unwrap();

        let requests = h.verifier.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].address, marketplace.address);
        assert!(requests[0].constructor_args.is_empty());
        assert_eq!(requests[1].address, dao.address);
    }

    #[tokio::test]
    async fn verification_failure_does_not_fail_the_deployment() {
        let mut h = harness("goerli", BOTH);
        h.ctx.verifier = Some(Arc::new(MockVerifier::answering(Err(
            "Network timeout".to_string(),
        ))));

        assert!(deploy_marketplace(&h.ctx).await.is_ok());
    }

    #[tokio::test]
    async fn partial_failure_keeps_the_marketplace_record() {
        let h = harness("goerli", &[(MARKETPLACE_CONTRACT, MARKETPLACE_ABI)]);
        let params = DaoParams {
            nft: NFT,
            extra: vec![],
            value: U256::ZERO,
        };

        let err = deploy_contracts(&h.ctx, &params).await.unwrap_err();
        assert!(matches!(err, ScriptError::ArtifactNotFound(_)));

        let recorded = h.ctx.deployments.address_of(MARKETPLACE_CONTRACT).unwrap();
        assert_eq!(recorded, Some(h.chain.deployer.create(0)));
        assert_eq!(h.ctx.deployments.address_of(DAO_CONTRACT).unwrap(), None);
    }

    #[tokio::test]
    async fn verifies_existing_contracts() {
        let h = harness("goerli", BOTH);
        let raw = [NFT, NFT, COMMUNITY].map(|a| a.to_string());

        let outcome = verify_contract(
            h.verifier.as_ref(),
            &h.ctx.artifacts,
            DAO_CONTRACT,
            COMMUNITY,
            &raw,
        )
        .await
        .unwrap();

        assert_eq!(outcome, VerificationOutcome::Verified);
        assert_eq!(h.verifier.requests()[0].constructor_args.raw(), raw.as_slice());

        // Wrong arity never reaches the explorer
        let result =
            verify_contract(h.verifier.as_ref(), &h.ctx.artifacts, DAO_CONTRACT, COMMUNITY, &[])
                .await;
        assert!(result.is_err());
        assert_eq!(h.verifier.requests().len(), 1);
    }

    #[test]
    fn confirmations_per_network() {
        let env = EnvConfig::default();
        let goerli = NetworkConfig::resolve("goerli", &env).unwrap();
        let hardhat = NetworkConfig::resolve("hardhat", &env).unwrap();
        let localhost = NetworkConfig::resolve("localhost", &env).unwrap();
        // Live networks wait for the deploy count, not their own setting
        assert_eq!(goerli.block_confirmations, 6);
        assert_eq!(default_confirmations(&goerli), DEPLOY_CONFIRMATIONS);
        assert_eq!(default_confirmations(&hardhat), hardhat.block_confirmations);
        assert_eq!(default_confirmations(&localhost), 1);
    }

    #[test]
    fn verifier_needs_live_network_and_key() {
        let artifacts = Artifacts::new("artifacts");
        let keyed = EnvConfig {
            etherscan_api_key: Some("KEY".to_string()),
            ..Default::default()
        };
        let goerli = NetworkConfig::resolve("goerli", &keyed).unwrap();
        let localhost = NetworkConfig::resolve("localhost", &keyed).unwrap();

        assert!(explorer_verifier(&goerli, &keyed, &artifacts, None).unwrap().is_some());
        assert!(explorer_verifier(&localhost, &keyed, &artifacts, None).unwrap().is_none());
        assert!(explorer_verifier(&goerli, &EnvConfig::default(), &artifacts, None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn parses_ether_amounts() {
        assert_eq!(
            parse_value("0.05").unwrap(),
            U256::from(50_000_000_000_000_000u64)
        );
        assert!(parse_value("lots").is_err());
    }
}
