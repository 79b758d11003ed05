//! Proof-of-Work Mining Simulator
//!
//! A didactic simulation of proof-of-work block mining:
//! - Parallel nonce search across a fixed pool of workers
//! - Difficulty retargeting from observed block times
//! - Reward halving on a fixed block interval
//! - A small HTTP interface for status queries and triggering mining runs

pub mod block;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod miner;
pub mod reward;
pub mod server;
pub mod types;
pub mod utils;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;

/// Application information
pub const APP_NAME: &str = "pow-mining-sim";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
