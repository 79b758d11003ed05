//! Parallel nonce search
//!
//! The coordinator partitions the nonce space into contiguous ranges, one per
//! worker, and runs each worker on the blocking thread pool. The first worker
//! to find a satisfying hash wins; the rest observe the shared cancellation
//! token and stop within one loop iteration.

use crate::block::BlockHeader;
use crate::difficulty::Target;
use crate::types::MiningResult;
use crate::utils::format_hash_rate;
use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default upper bound of the nonce search space
pub const MAX_NONCE: u64 = 1 << 32;

/// Outcome of searching a single nonce partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A nonce in the partition produced a satisfying hash
    Found { nonce: u64, hash: String },
    /// The partition was searched (or abandoned on cancellation) without a match
    Exhausted { hashes_tried: u64 },
}

/// Search one nonce partition in increasing order.
///
/// Every hash attempt bumps the shared counter. The cancellation token is
/// checked on each iteration, so a worker stops hashing within one iteration
/// of the winner being published.
pub fn search_partition(
    header: &BlockHeader,
    range: Range<u64>,
    target: Target,
    hash_counter: &AtomicU64,
    cancellation: &CancellationToken,
) -> SearchOutcome {
    let prefix = header.encode_prefix();
    let mut buf = Vec::with_capacity(prefix.len() + 20);
    let mut hashes_tried = 0u64;

    for nonce in range {
        if cancellation.is_cancelled() {
            break;
        }

        buf.clear();
        buf.extend_from_slice(&prefix);
        buf.extend_from_slice(nonce.to_string().as_bytes());

        let digest = Sha256::digest(&buf);
        hashes_tried += 1;
        hash_counter.fetch_add(1, Ordering::Relaxed);

        if target.is_met_by_digest(&digest) {
            return SearchOutcome::Found {
                nonce,
                hash: hex::encode(digest),
            };
        }
    }

    SearchOutcome::Exhausted { hashes_tried }
}

/// Parallel mining coordinator
#[derive(Debug, Clone)]
pub struct Miner {
    num_workers: usize,
    max_nonce: u64,
}

impl Miner {
    /// Create a coordinator with the given worker count and nonce bound.
    ///
    /// A worker count of zero selects the available parallelism.
    pub fn new(num_workers: usize, max_nonce: u64) -> Self {
        let num_workers = if num_workers == 0 {
            num_cpus::get()
        } else {
            num_workers
        };

        Self {
            num_workers,
            max_nonce: max_nonce.max(1),
        }
    }

    /// Number of workers the coordinator will launch
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Contiguous partitions covering `[0, max_nonce)`
    fn partitions(&self) -> Vec<Range<u64>> {
        let step = self.max_nonce.div_ceil(self.num_workers as u64);
        (0..self.num_workers as u64)
            .map(|i| {
                let start = (i * step).min(self.max_nonce);
                let end = ((i + 1) * step).min(self.max_nonce);
                start..end
            })
            .filter(|range| !range.is_empty())
            .collect()
    }

    /// Mine the header: launch one worker per partition and return the first
    /// solution.
    ///
    /// Fails with `NonceSpaceExhausted` when every partition is searched
    /// without a match, and with `Cancelled` when the caller's token fires
    /// before a solution is found. When two workers find a solution at nearly
    /// the same instant, whichever result reaches the channel first wins.
    pub async fn mine(
        &self,
        header: &BlockHeader,
        target: Target,
        cancellation: CancellationToken,
    ) -> Result<MiningResult> {
        info!(
            "Mining block {} with {} workers over {} nonces ({})",
            header.block_number, self.num_workers, self.max_nonce, target
        );

        let start = Instant::now();
        let hash_counter = Arc::new(AtomicU64::new(0));
        let (solution_tx, mut solution_rx) = mpsc::unbounded_channel();

        let mut handles = Vec::new();
        for (worker_id, range) in self.partitions().into_iter().enumerate() {
            let header = header.clone();
            let counter = Arc::clone(&hash_counter);
            let token = cancellation.clone();
            let tx = solution_tx.clone();

            handles.push(task::spawn_blocking(move || {
                debug!(
                    "Worker {} searching nonces {}..{}",
                    worker_id, range.start, range.end
                );
                match search_partition(&header, range, target, &counter, &token) {
                    SearchOutcome::Found { nonce, hash } => {
                        debug!("Worker {} found nonce {}", worker_id, nonce);
                        let _ = tx.send((nonce, hash));
                    }
                    SearchOutcome::Exhausted { hashes_tried } => {
                        debug!(
                            "Worker {} exhausted its partition after {} hashes",
                            worker_id, hashes_tried
                        );
                    }
                }
            }));
        }

        // The channel closing without a message means every partition finished
        // empty-handed.
        drop(solution_tx);

        let winner = tokio::select! {
            solution = solution_rx.recv() => solution,
            _ = cancellation.cancelled() => {
                for handle in handles {
                    let _ = handle.await;
                }
                return Err(Error::cancelled("mining"));
            }
        };

        // Stop the remaining workers and wait for them to wind down.
        cancellation.cancel();
        for handle in handles {
            let _ = handle.await;
        }

        let elapsed = start.elapsed();
        let hash_count = hash_counter.load(Ordering::Relaxed);
        let elapsed_secs = elapsed.as_secs_f64();
        let rate = if elapsed_secs > 0.0 {
            hash_count as f64 / elapsed_secs
        } else {
            0.0
        };

        match winner {
            Some((nonce, hash)) => {
                info!(
                    "Mined block {} with nonce {} in {:.2}s ({} hashes, {})",
                    header.block_number,
                    nonce,
                    elapsed_secs,
                    hash_count,
                    format_hash_rate(rate)
                );
                Ok(MiningResult {
                    nonce,
                    hash,
                    elapsed_secs,
                    hash_count,
                })
            }
            None => {
                warn!(
                    "No nonce in [0, {}) satisfies the target after {} hashes",
                    self.max_nonce, hash_count
                );
                Err(Error::NonceSpaceExhausted {
                    hashes_tried: hash_count,
                })
            }
        }
    }
}
