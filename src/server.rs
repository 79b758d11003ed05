//! HTTP status service
//!
//! Two routes: `GET /status` returns a snapshot of the current mining job,
//! `POST /mine` starts a job if none is running. Jobs run asynchronously;
//! the start request returns 202 Accepted and completion is observed through
//! the status endpoint.

use crate::block::{parse_transactions, BlockHeader};
use crate::config::DEFAULT_TRANSACTIONS;
use crate::difficulty::{self, Difficulty, Target};
use crate::miner::Miner;
use crate::reward::RewardLedger;
use crate::types::{JobState, MiningJobStatus, MiningResult};
use crate::{Error, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Previous hash used before any block has been mined
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Chain bookkeeping carried between mining jobs
#[derive(Debug)]
pub struct ChainState {
    pub difficulty: Difficulty,
    pub ledger: RewardLedger,
    pub previous_hash: String,
    pub target_block_time: Duration,
}

impl ChainState {
    /// Fresh chain state at height zero
    pub fn new(
        difficulty: Difficulty,
        ledger: RewardLedger,
        target_block_time: Duration,
    ) -> Self {
        Self {
            difficulty,
            ledger,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            target_block_time,
        }
    }

    /// Current chain height
    pub fn height(&self) -> u64 {
        self.ledger.height()
    }

    /// Record a freshly mined block: advance the ledger, remember the hash,
    /// and retarget difficulty for the next block. Returns the block reward.
    pub fn record_block(&mut self, hash: &str, elapsed: Duration) -> f64 {
        self.previous_hash = hash.to_string();
        let reward = self.ledger.record_block();

        let next = difficulty::adjust(self.difficulty, elapsed, self.target_block_time);
        if next != self.difficulty {
            info!(
                "Retargeting difficulty {} -> {} after a {:.2}s block",
                self.difficulty,
                next,
                elapsed.as_secs_f64()
            );
            self.difficulty = next;
        }

        reward
    }
}

/// Shared state behind the HTTP handlers.
///
/// The status cell has a single writer (the running job task); handlers read
/// snapshots through the lock and never hold it across an await.
pub struct AppState {
    status: RwLock<MiningJobStatus>,
    chain: Mutex<ChainState>,
    num_workers: usize,
    max_nonce: u64,
    /// Job-level cancellation, propagated to the coordinator of every job
    cancellation: CancellationToken,
}

impl AppState {
    pub fn new(chain: ChainState, num_workers: usize, max_nonce: u64) -> Arc<Self> {
        let status = MiningJobStatus::idle(chain.difficulty);
        Arc::new(Self {
            status: RwLock::new(status),
            chain: Mutex::new(chain),
            num_workers,
            max_nonce,
            cancellation: CancellationToken::new(),
        })
    }

    /// Snapshot of the current job status
    pub async fn status(&self) -> MiningJobStatus {
        self.status.read().await.clone()
    }

    /// Seed the status cell with a result mined outside the server (the
    /// initial CLI run).
    pub async fn seed_result(&self, block_number: u64, result: MiningResult) {
        let difficulty = self.chain.lock().await.difficulty;
        let mut status = self.status.write().await;
        status.state = JobState::Done;
        status.current_block = Some(block_number);
        status.difficulty = difficulty;
        status.hash_rate = result.hash_rate();
        status.last_result = Some(result);
    }

    /// Cancel any in-flight job
    pub fn shutdown(&self) {
        self.cancellation.cancel();
    }
}

/// Body of a `POST /mine` request; missing fields fall back to chain state
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MineRequest {
    pub difficulty: Option<Difficulty>,
    pub num_workers: Option<usize>,
    pub transactions: Option<String>,
    pub block_number: Option<u64>,
    pub previous_hash: Option<String>,
}

/// Acknowledgement returned when a job is accepted
#[derive(Debug, Clone, Serialize)]
pub struct MineAccepted {
    pub block_number: u64,
    pub difficulty: Difficulty,
    pub num_workers: usize,
}

/// Build the service router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/mine", post(mine_handler))
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Status server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<MiningJobStatus> {
    Json(state.status().await)
}

async fn mine_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MineRequest>,
) -> impl IntoResponse {
    match start_job(state, request).await {
        Ok(accepted) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "accepted",
                "block_number": accepted.block_number,
                "difficulty": accepted.difficulty,
                "num_workers": accepted.num_workers,
            })),
        ),
        Err(err) => (error_status(&err), Json(json!({ "error": err.to_string() }))),
    }
}

fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::JobAlreadyRunning => StatusCode::CONFLICT,
        Error::InvalidDifficulty { .. } | Error::Config { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Validate the request, claim the single job slot, and spawn the job task
async fn start_job(state: Arc<AppState>, request: MineRequest) -> Result<MineAccepted> {
    let transactions = parse_transactions(
        request.transactions.as_deref().unwrap_or(DEFAULT_TRANSACTIONS),
    )?;

    let num_workers = request.num_workers.unwrap_or(state.num_workers);
    if num_workers == 0 {
        return Err(Error::config("num_workers must be greater than zero"));
    }

    let (difficulty, block_number, previous_hash) = {
        let chain = state.chain.lock().await;
        (
            request.difficulty.unwrap_or(chain.difficulty),
            request.block_number.unwrap_or(chain.height() + 1),
            request
                .previous_hash
                .clone()
                .unwrap_or_else(|| chain.previous_hash.clone()),
        )
    };

    // Claim the single job slot; losing this race returns JobAlreadyRunning.
    {
        let mut status = state.status.write().await;
        if status.state == JobState::Running {
            return Err(Error::JobAlreadyRunning);
        }
        status.state = JobState::Running;
        status.current_block = Some(block_number);
        status.difficulty = difficulty;
        status.last_result = None;
    }

    info!(
        "Accepted mining job for block {} at {} difficulty ({} workers)",
        block_number, difficulty, num_workers
    );

    let header = BlockHeader::new(block_number, transactions, previous_hash);
    let miner = Miner::new(num_workers, state.max_nonce);
    let job_state = Arc::clone(&state);
    tokio::spawn(async move {
        run_job(job_state, miner, header, difficulty).await;
    });

    Ok(MineAccepted {
        block_number,
        difficulty,
        num_workers,
    })
}

/// Run one mining job to completion and publish the outcome
async fn run_job(state: Arc<AppState>, miner: Miner, header: BlockHeader, difficulty: Difficulty) {
    let target = Target::for_difficulty(difficulty);
    let token = state.cancellation.child_token();

    match miner.mine(&header, target, token).await {
        Ok(result) => {
            let elapsed = Duration::from_secs_f64(result.elapsed_secs);
            let (reward, next_difficulty) = {
                let mut chain = state.chain.lock().await;
                let reward = chain.record_block(&result.hash, elapsed);
                (reward, chain.difficulty)
            };

            info!(
                "Block {} mined: hash {}, reward {}",
                header.block_number, result.hash, reward
            );

            let mut status = state.status.write().await;
            status.state = JobState::Done;
            status.difficulty = next_difficulty;
            status.hash_rate = result.hash_rate();
            status.last_result = Some(result);
        }
        Err(err) => {
            error!(
                "Mining job for block {} failed ({}): {}",
                header.block_number,
                err.category(),
                err
            );
            let mut status = state.status.write().await;
            status.state = JobState::Failed;
            status.last_result = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state(max_nonce: u64) -> Arc<AppState> {
        let chain = ChainState::new(
            Difficulty::Easy,
            RewardLedger::new(50.0, 2),
            Duration::from_secs(600),
        );
        AppState::new(chain, 2, max_nonce)
    }

    async fn get_status(state: &Arc<AppState>) -> MiningJobStatus {
        let response = router(Arc::clone(state))
            .oneshot(
                Request::builder()
                    .uri("/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn post_mine(state: &Arc<AppState>, body: &str) -> (StatusCode, serde_json::Value) {
        let response = router(Arc::clone(state))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mine")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn wait_for_completion(state: &Arc<AppState>) -> MiningJobStatus {
        for _ in 0..200 {
            let status = get_status(state).await;
            if status.state != JobState::Running {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job did not complete in time");
    }

    #[tokio::test]
    async fn test_status_starts_idle() {
        let state = test_state(1 << 32);
        let status = get_status(&state).await;
        assert_eq!(status.state, JobState::Idle);
        assert_eq!(status.difficulty, Difficulty::Easy);
        assert!(status.last_result.is_none());
    }

    #[tokio::test]
    async fn test_mine_job_completes_and_updates_status() {
        let state = test_state(1 << 32);
        let (code, body) = post_mine(
            &state,
            r#"{"difficulty": "easy", "transactions": "A->B->20,C->D->45"}"#,
        )
        .await;
        assert_eq!(code, StatusCode::ACCEPTED);
        assert_eq!(body["block_number"], 1);

        let status = wait_for_completion(&state).await;
        assert_eq!(status.state, JobState::Done);
        let result = status.last_result.expect("completed job has a result");
        assert!(Difficulty::Easy.target().is_met_by(&result.hash));

        // Rebuild the header and verify the hash independently.
        let header = BlockHeader::new(
            1,
            parse_transactions("A->B->20,C->D->45").unwrap(),
            GENESIS_PREVIOUS_HASH,
        );
        assert_eq!(header.with_nonce(result.nonce).hash(), result.hash);
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_while_running() {
        let state = test_state(1 << 32);

        // Claim the slot directly; spawning a real long-running job would
        // make the test racy.
        state.status.write().await.state = JobState::Running;

        let (code, body) = post_mine(&state, r#"{"difficulty": "easy"}"#).await;
        assert_eq!(code, StatusCode::CONFLICT);
        assert_eq!(body["error"], "A mining job is already running");
    }

    #[tokio::test]
    async fn test_invalid_transactions_are_rejected() {
        let state = test_state(1 << 32);
        let (code, body) = post_mine(&state, r#"{"transactions": "garbage"}"#).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("malformed"));

        // Nothing was started.
        let status = get_status(&state).await;
        assert_eq!(status.state, JobState::Idle);
    }

    #[tokio::test]
    async fn test_failed_job_is_reported() {
        // Nonce space too small for the hard target: the job fails with
        // NonceSpaceExhausted and the status reflects it.
        let state = test_state(16);
        let (code, _) = post_mine(&state, r#"{"difficulty": "hard"}"#).await;
        assert_eq!(code, StatusCode::ACCEPTED);

        let status = wait_for_completion(&state).await;
        assert_eq!(status.state, JobState::Failed);
        assert!(status.last_result.is_none());
    }

    #[tokio::test]
    async fn test_chain_state_advances_between_jobs() {
        let state = test_state(1 << 32);
        let (code, _) = post_mine(&state, r#"{"difficulty": "easy"}"#).await;
        assert_eq!(code, StatusCode::ACCEPTED);
        let first = wait_for_completion(&state).await;
        let first_hash = first.last_result.unwrap().hash;

        {
            let chain = state.chain.lock().await;
            assert_eq!(chain.height(), 1);
            assert_eq!(chain.previous_hash, first_hash);
        }

        // The next job chains onto the first block.
        let (code, body) = post_mine(&state, r#"{"difficulty": "easy"}"#).await;
        assert_eq!(code, StatusCode::ACCEPTED);
        assert_eq!(body["block_number"], 2);
        let second = wait_for_completion(&state).await;
        assert_eq!(second.state, JobState::Done);
    }

    #[tokio::test]
    async fn test_record_block_pays_reward_and_retargets() {
        let mut chain = ChainState::new(
            Difficulty::Medium,
            RewardLedger::new(50.0, 2),
            Duration::from_secs(600),
        );

        // Fast block: reward paid, difficulty stepped up.
        let reward = chain.record_block("00ab", Duration::from_secs(10));
        assert_eq!(reward, 50.0);
        assert_eq!(chain.difficulty, Difficulty::Hard);
        assert_eq!(chain.previous_hash, "00ab");

        // Second block lands on the halving boundary.
        let reward = chain.record_block("00cd", Duration::from_secs(600));
        assert_eq!(reward, 25.0);
        assert_eq!(chain.difficulty, Difficulty::Hard);
    }
}
