//! Configuration: CLI arguments layered over an optional block-template file
//!
//! Precedence, highest first: explicit CLI flags, config-file fields,
//! built-in defaults. The config file only carries the block template
//! (`block_number`, `transactions`, `previous_hash`), matching the fields a
//! mining run varies between invocations.

use crate::block::parse_transactions;
use crate::difficulty::Difficulty;
use crate::miner::MAX_NONCE;
use crate::reward::RewardLedger;
use crate::{Error, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Block number used when neither the CLI nor the config file sets one
pub const DEFAULT_BLOCK_NUMBER: u64 = 5;
/// Sample transactions mined by default
pub const DEFAULT_TRANSACTIONS: &str = "Dhaval->Bhavin->20,Mando->Cara->45";
/// Sample previous hash mined against by default
pub const DEFAULT_PREVIOUS_HASH: &str =
    "0000000xa036944e29568d0cff17edbe038f81208fecf9a66be9a2b8321c6ec7";

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Block template fields a config file may provide
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockTemplate {
    pub block_number: Option<u64>,
    pub transactions: Option<String>,
    pub previous_hash: Option<String>,
}

/// Resolved block inputs for a mining run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBlock {
    pub block_number: u64,
    pub transactions: Vec<String>,
    pub previous_hash: String,
}

/// Complete configuration for the mining simulator
#[derive(Debug, Clone, Parser, Serialize)]
#[command(
    name = "pow-mining-sim",
    version = env!("CARGO_PKG_VERSION"),
    about = "Proof-of-work mining simulator",
    long_about = "A didactic proof-of-work mining simulator with parallel nonce search, \
                  difficulty retargeting, reward halving, and an HTTP status interface"
)]
pub struct Config {
    /// Mining difficulty
    #[arg(short, long, value_enum, ignore_case = true, default_value = "medium")]
    pub difficulty: Difficulty,

    /// Block number to mine (overrides the config file)
    #[arg(long)]
    pub block_number: Option<u64>,

    /// Comma-separated transactions, e.g. "A->B->20,C->D->45"
    #[arg(long)]
    pub transactions: Option<String>,

    /// Hash of the previous block
    #[arg(long)]
    pub previous_hash: Option<String>,

    /// Number of parallel mining workers (default: available parallelism)
    #[arg(short = 'w', long)]
    pub num_workers: Option<usize>,

    /// Block template file (JSON or YAML) with block_number/transactions/previous_hash
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// File the mined block is written to
    #[arg(long, value_name = "FILE", default_value = "mined_block.json")]
    pub save_file: PathBuf,

    /// Upper bound of the nonce search space
    #[arg(long, default_value_t = MAX_NONCE)]
    pub max_nonce: u64,

    /// Target block time in seconds, used for difficulty retargeting
    #[arg(long, default_value_t = 600)]
    pub target_block_time: u64,

    /// Blocks between reward halvings
    #[arg(long, default_value_t = RewardLedger::DEFAULT_HALVING_INTERVAL)]
    pub halving_interval: u64,

    /// Initial block reward
    #[arg(long, default_value_t = RewardLedger::DEFAULT_INITIAL_REWARD)]
    pub initial_reward: f64,

    /// Start the HTTP status server after the CLI mining run
    #[arg(long)]
    pub serve: bool,

    /// Skip the initial CLI mining run (useful with --serve)
    #[arg(long)]
    pub skip_mine: bool,

    /// HTTP server interface
    #[arg(long, default_value = "0.0.0.0")]
    pub interface: String,

    /// HTTP server port
    #[arg(short, long, default_value_t = 5000)]
    pub port: u16,

    /// Log level
    #[arg(short = 'l', long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Print the resolved configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Config {
    /// Parse CLI arguments and validate them
    pub fn load() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == Some(0) {
            return Err(Error::config("num_workers must be greater than zero"));
        }

        if self.max_nonce == 0 {
            return Err(Error::config("max_nonce must be greater than zero"));
        }

        if self.initial_reward <= 0.0 {
            return Err(Error::config("initial_reward must be positive"));
        }

        if self.interface.parse::<IpAddr>().is_err() {
            return Err(Error::config(format!(
                "invalid interface address: {}",
                self.interface
            )));
        }

        if let Some(transactions) = &self.transactions {
            parse_transactions(transactions)?;
        }

        Ok(())
    }

    /// Resolve the block template: CLI flags override file values, the file
    /// overrides built-in defaults.
    pub async fn resolve_block(&self) -> Result<ResolvedBlock> {
        let file = match &self.config_file {
            Some(path) => Self::load_template(path).await?,
            None => BlockTemplate::default(),
        };

        let block_number = self
            .block_number
            .or(file.block_number)
            .unwrap_or(DEFAULT_BLOCK_NUMBER);
        let transactions = self
            .transactions
            .clone()
            .or(file.transactions)
            .unwrap_or_else(|| DEFAULT_TRANSACTIONS.to_string());
        let previous_hash = self
            .previous_hash
            .clone()
            .or(file.previous_hash)
            .unwrap_or_else(|| DEFAULT_PREVIOUS_HASH.to_string());

        Ok(ResolvedBlock {
            block_number,
            transactions: parse_transactions(&transactions)?,
            previous_hash,
        })
    }

    /// Load a block template from a JSON or YAML file
    async fn load_template(path: &Path) -> Result<BlockTemplate> {
        let content = tokio::fs::read_to_string(path).await?;

        let parsed = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(|e| {
                Error::config(format!("invalid config file {}: {}", path.display(), e))
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| {
                Error::config(format!("invalid config file {}: {}", path.display(), e))
            })?
        };

        Ok(parsed)
    }

    /// Worker count, falling back to available parallelism
    pub fn num_workers(&self) -> usize {
        self.num_workers.unwrap_or_else(num_cpus::get)
    }

    /// Target block time as a duration
    pub fn target_block_time(&self) -> Duration {
        Duration::from_secs(self.target_block_time)
    }

    /// Socket address for the HTTP server
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .interface
            .parse()
            .map_err(|e| Error::config(format!("invalid interface: {}", e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["pow-mining-sim"]).unwrap();
        assert_eq!(config.difficulty, Difficulty::Medium);
        assert_eq!(config.block_number, None);
        assert_eq!(config.save_file, PathBuf::from("mined_block.json"));
        assert_eq!(config.max_nonce, MAX_NONCE);
        assert_eq!(config.target_block_time, 600);
        assert_eq!(config.halving_interval, 210_000);
        assert_eq!(config.initial_reward, 50.0);
        assert_eq!(config.port, 5000);
        assert!(!config.serve);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_resolve_block_built_in_defaults() {
        let config = Config::try_parse_from(["pow-mining-sim"]).unwrap();
        let block = config.resolve_block().await.unwrap();
        assert_eq!(block.block_number, DEFAULT_BLOCK_NUMBER);
        assert_eq!(
            block.transactions,
            vec!["Dhaval->Bhavin->20", "Mando->Cara->45"]
        );
        assert_eq!(block.previous_hash, DEFAULT_PREVIOUS_HASH);
    }

    #[tokio::test]
    async fn test_config_file_overrides_defaults() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(
            file,
            r#"{{"block_number": 9, "transactions": "A->B->1", "previous_hash": "ff"}}"#
        )
        .unwrap();

        let config = Config::try_parse_from([
            "pow-mining-sim",
            "--config-file",
            file.path().to_str().unwrap(),
        ])
        .unwrap();

        let block = config.resolve_block().await.unwrap();
        assert_eq!(block.block_number, 9);
        assert_eq!(block.transactions, vec!["A->B->1"]);
        assert_eq!(block.previous_hash, "ff");
    }

    #[tokio::test]
    async fn test_cli_flags_override_config_file() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(file, r#"{{"block_number": 9, "transactions": "A->B->1"}}"#).unwrap();

        let config = Config::try_parse_from([
            "pow-mining-sim",
            "--config-file",
            file.path().to_str().unwrap(),
            "--block-number",
            "42",
        ])
        .unwrap();

        let block = config.resolve_block().await.unwrap();
        // CLI wins over the file, the file wins over defaults.
        assert_eq!(block.block_number, 42);
        assert_eq!(block.transactions, vec!["A->B->1"]);
        assert_eq!(block.previous_hash, DEFAULT_PREVIOUS_HASH);
    }

    #[tokio::test]
    async fn test_yaml_config_file() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(file, "block_number: 3\ntransactions: \"C->D->7\"\n").unwrap();

        let config = Config::try_parse_from([
            "pow-mining-sim",
            "--config-file",
            file.path().to_str().unwrap(),
        ])
        .unwrap();

        let block = config.resolve_block().await.unwrap();
        assert_eq!(block.block_number, 3);
        assert_eq!(block.transactions, vec!["C->D->7"]);
    }

    #[tokio::test]
    async fn test_malformed_config_file() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(file, "{{not json").unwrap();

        let config = Config::try_parse_from([
            "pow-mining-sim",
            "--config-file",
            file.path().to_str().unwrap(),
        ])
        .unwrap();

        assert_matches!(config.resolve_block().await, Err(Error::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config =
            Config::try_parse_from(["pow-mining-sim", "--num-workers", "0"]).unwrap();
        assert_matches!(config.validate(), Err(Error::Config { .. }));

        let config = Config::try_parse_from(["pow-mining-sim", "--max-nonce", "0"]).unwrap();
        assert_matches!(config.validate(), Err(Error::Config { .. }));

        let config =
            Config::try_parse_from(["pow-mining-sim", "--interface", "not-an-ip"]).unwrap();
        assert_matches!(config.validate(), Err(Error::Config { .. }));

        let config =
            Config::try_parse_from(["pow-mining-sim", "--transactions", "garbage"]).unwrap();
        assert_matches!(config.validate(), Err(Error::Config { .. }));
    }

    #[test]
    fn test_unknown_difficulty_is_rejected_by_clap() {
        assert!(Config::try_parse_from(["pow-mining-sim", "--difficulty", "impossible"]).is_err());
    }

    #[test]
    fn test_difficulty_labels_accept_any_case() {
        for (label, expected) in [
            ("Easy", Difficulty::Easy),
            ("easy", Difficulty::Easy),
            ("Medium", Difficulty::Medium),
            ("MEDIUM", Difficulty::Medium),
            ("Hard", Difficulty::Hard),
        ] {
            let config =
                Config::try_parse_from(["pow-mining-sim", "--difficulty", label]).unwrap();
            assert_eq!(config.difficulty, expected, "label {:?}", label);
        }
    }

    #[test]
    fn test_socket_addr() {
        let config =
            Config::try_parse_from(["pow-mining-sim", "--interface", "127.0.0.1", "-p", "8080"])
                .unwrap();
        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:8080");
    }
}
