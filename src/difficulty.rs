//! Difficulty levels, hash targets, and retargeting
//!
//! The difficulty-to-target mapping is a fixed table of leading zero hex
//! digits. Retargeting compares the observed mining time against a target
//! block time and moves one step at a time, saturating at the bounds.

use crate::{Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Mining difficulty level
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "Easy")]
    Easy,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Hard")]
    Hard,
}

impl Difficulty {
    /// Raise difficulty one step, capped at `Hard`
    pub fn step_up(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium | Difficulty::Hard => Difficulty::Hard,
        }
    }

    /// Lower difficulty one step, floored at `Easy`
    pub fn step_down(self) -> Self {
        match self {
            Difficulty::Hard => Difficulty::Medium,
            Difficulty::Medium | Difficulty::Easy => Difficulty::Easy,
        }
    }

    /// Get the hash target for this difficulty
    pub fn target(self) -> Target {
        Target::for_difficulty(self)
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(Error::invalid_difficulty(s)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// Hash target: the number of leading zero hex digits a block hash must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target {
    leading_hex_zeros: u8,
}

impl Target {
    /// Create a target requiring `leading_hex_zeros` zero hex digits
    pub fn new(leading_hex_zeros: u8) -> Self {
        Self { leading_hex_zeros }
    }

    /// Fixed difficulty table: easy = 2, medium = 4, hard = 6 zero hex digits
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        let leading_hex_zeros = match difficulty {
            Difficulty::Easy => 2,
            Difficulty::Medium => 4,
            Difficulty::Hard => 6,
        };
        Self { leading_hex_zeros }
    }

    /// Number of leading zero hex digits required
    pub fn leading_hex_zeros(&self) -> u8 {
        self.leading_hex_zeros
    }

    /// Check whether a hex-encoded hash meets this target
    pub fn is_met_by(&self, hash_hex: &str) -> bool {
        let n = self.leading_hex_zeros as usize;
        hash_hex.len() >= n && hash_hex.bytes().take(n).all(|b| b == b'0')
    }

    /// Nibble check on the raw digest, avoiding hex encoding in the search loop
    pub fn is_met_by_digest(&self, digest: &[u8]) -> bool {
        let n = self.leading_hex_zeros as usize;
        let full_bytes = n / 2;
        if digest.len() * 2 < n {
            return false;
        }
        if !digest[..full_bytes].iter().all(|&b| b == 0) {
            return false;
        }
        n % 2 == 0 || digest[full_bytes] & 0xF0 == 0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} leading zero hex digits", self.leading_hex_zeros)
    }
}

/// Retarget difficulty from the time the last block took to mine.
///
/// Blocks mined in under half the target time raise difficulty one step,
/// blocks slower than twice the target time lower it one step, anything in
/// between leaves it unchanged. Steps saturate at `Easy` and `Hard`.
pub fn adjust(previous: Difficulty, elapsed: Duration, target_time: Duration) -> Difficulty {
    if elapsed < target_time / 2 {
        previous.step_up()
    } else if elapsed > target_time * 2 {
        previous.step_down()
    } else {
        previous
    }
}
