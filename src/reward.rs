//! Block reward bookkeeping with periodic halving

/// Tracks block height and the current reward, halving it every fixed
/// interval of blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardLedger {
    height: u64,
    reward: f64,
    halving_interval: u64,
}

impl RewardLedger {
    /// Initial reward used by the simulation
    pub const DEFAULT_INITIAL_REWARD: f64 = 50.0;
    /// Blocks between reward halvings
    pub const DEFAULT_HALVING_INTERVAL: u64 = 210_000;

    /// Create a ledger at height zero.
    ///
    /// A zero halving interval is clamped to one.
    pub fn new(initial_reward: f64, halving_interval: u64) -> Self {
        Self {
            height: 0,
            reward: initial_reward,
            halving_interval: halving_interval.max(1),
        }
    }

    /// Record a mined block and return the reward paid for it.
    ///
    /// The reward halves when the new height lands on a halving boundary,
    /// and the halved value applies to that block.
    pub fn record_block(&mut self) -> f64 {
        self.height += 1;
        if self.height % self.halving_interval == 0 {
            self.reward /= 2.0;
        }
        self.reward
    }

    /// Current block height
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Reward the next non-boundary block would pay
    pub fn current_reward(&self) -> f64 {
        self.reward
    }
}

impl Default for RewardLedger {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL_REWARD, Self::DEFAULT_HALVING_INTERVAL)
    }
}
