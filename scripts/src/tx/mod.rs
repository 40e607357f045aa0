//! Chain access for the deploy scripts

pub mod backend;
pub mod client;
pub mod confirmations;

pub use backend::{DeployBackend, MinedTransaction};
pub use client::RpcClient;
pub use confirmations::ConfirmationPolicy;
