//! Mining simulator entry point
//!
//! Runs one mining pass from the CLI configuration, writes the mined block to
//! the save file, and optionally keeps serving the HTTP status interface.

use pow_mining_sim::{
    block::BlockHeader,
    config::Config,
    difficulty::Target,
    miner::Miner,
    reward::RewardLedger,
    server::{self, AppState, ChainState},
    types::{MinedBlock, MiningResult},
    Result, APP_NAME, APP_VERSION,
};

use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    let level: tracing::Level = config.log_level.into();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    if config.print_config {
        print_configuration(&config)?;
        return Ok(());
    }

    info!("Starting {} v{}", APP_NAME, APP_VERSION);

    let mut chain = ChainState::new(
        config.difficulty,
        RewardLedger::new(config.initial_reward, config.halving_interval),
        config.target_block_time(),
    );

    let mut cli_result: Option<(u64, MiningResult)> = None;
    if !config.skip_mine {
        cli_result = Some(run_cli_mining(&config, &mut chain).await?);
    }

    if config.serve {
        let addr = config.socket_addr()?;
        let state = AppState::new(chain, config.num_workers(), config.max_nonce);
        if let Some((block_number, result)) = cli_result {
            state.seed_result(block_number, result).await;
        }
        server::serve(state, addr).await?;
    }

    Ok(())
}

/// Mine one block from the resolved CLI/file template and persist it
async fn run_cli_mining(config: &Config, chain: &mut ChainState) -> Result<(u64, MiningResult)> {
    let block = config.resolve_block().await?;

    info!(
        "Start mining for block {} with difficulty {}",
        block.block_number, config.difficulty
    );

    let header = BlockHeader::new(
        block.block_number,
        block.transactions.clone(),
        block.previous_hash.clone(),
    );
    let miner = Miner::new(config.num_workers(), config.max_nonce);
    let target = Target::for_difficulty(config.difficulty);

    let result = miner
        .mine(&header, target, CancellationToken::new())
        .await?;

    let reward = chain.record_block(&result.hash, Duration::from_secs_f64(result.elapsed_secs));

    let mined = MinedBlock {
        block_number: block.block_number,
        transactions: block.transactions,
        previous_hash: block.previous_hash,
        nonce: result.nonce,
        hash: result.hash.clone(),
        reward,
        elapsed_time: result.elapsed_secs,
    };
    save_block(&mined, &config.save_file).await?;
    info!("Mined block saved to {}", config.save_file.display());

    Ok((block.block_number, result))
}

/// Write the mined block JSON to the save file
async fn save_block(block: &MinedBlock, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(block)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Print the resolved configuration as YAML
fn print_configuration(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config)?;
    println!("{}", yaml);
    Ok(())
}
