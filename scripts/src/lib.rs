//! Scripts for deploying and verifying the CryptoDevs DAO contracts.

#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod errors;

/// Our deploy utils
pub mod deploy;

// Our output utils
pub mod output_writer;

pub mod tx;

/// Explorer source verification
pub mod verify;
