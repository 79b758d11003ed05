//! Core data types shared across the simulator

use crate::difficulty::Difficulty;
use serde::{Deserialize, Serialize};

/// Outcome of a successful mining run, read-only once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningResult {
    /// Winning nonce
    pub nonce: u64,
    /// Hex-encoded block hash meeting the target
    pub hash: String,
    /// Wall-clock mining time in seconds
    pub elapsed_secs: f64,
    /// Total hashes computed across all workers
    pub hash_count: u64,
}

impl MiningResult {
    /// Observed hash rate in hashes per second
    pub fn hash_rate(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.hash_count as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}

/// Lifecycle of the process-wide mining job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Done,
    Failed,
}

/// Snapshot of the current mining job, served by the status endpoint.
///
/// Single-writer: only the running job task mutates it. Readers clone a
/// snapshot and never hold the lock across awaits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningJobStatus {
    pub state: JobState,
    /// Block number of the in-flight or most recent job
    pub current_block: Option<u64>,
    /// Difficulty the next block will be mined at
    pub difficulty: Difficulty,
    /// Hash rate of the most recent run, in hashes per second
    pub hash_rate: f64,
    pub last_result: Option<MiningResult>,
}

impl MiningJobStatus {
    /// Fresh idle status at the given difficulty
    pub fn idle(difficulty: Difficulty) -> Self {
        Self {
            state: JobState::Idle,
            current_block: None,
            difficulty,
            hash_rate: 0.0,
            last_result: None,
        }
    }
}

/// Durable record written to the save file after a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinedBlock {
    pub block_number: u64,
    pub transactions: Vec<String>,
    pub previous_hash: String,
    pub nonce: u64,
    pub hash: String,
    pub reward: f64,
    pub elapsed_time: f64,
}
