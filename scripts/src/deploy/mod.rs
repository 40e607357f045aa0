//! Contract factories and deployment

mod deploy;
mod factory;

pub use deploy::{deploy_contract, predict_contract_address, DeploymentRecord};
pub use factory::{ConstructorArgs, ContractFactory};
