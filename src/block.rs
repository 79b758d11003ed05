//! Block headers: canonical encoding, hashing, and transaction parsing

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Candidate block header
///
/// The nonce is the only field varied during mining; everything else is fixed
/// when the header is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub block_number: u64,
    pub transactions: Vec<String>,
    pub previous_hash: String,
    pub nonce: u64,
}

impl BlockHeader {
    /// Create a header with nonce zero
    pub fn new(
        block_number: u64,
        transactions: Vec<String>,
        previous_hash: impl Into<String>,
    ) -> Self {
        Self {
            block_number,
            transactions,
            previous_hash: previous_hash.into(),
            nonce: 0,
        }
    }

    /// Copy of this header with a different nonce
    pub fn with_nonce(&self, nonce: u64) -> Self {
        Self {
            nonce,
            ..self.clone()
        }
    }

    /// Canonical header bytes.
    ///
    /// Format: `{block_number}|{tx_0;tx_1;...}|{previous_hash}|{nonce}` as
    /// ASCII. Fields appear in this order and transactions are joined with
    /// `;`, so identical inputs always produce identical bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.encode_prefix();
        bytes.extend_from_slice(self.nonce.to_string().as_bytes());
        bytes
    }

    /// Everything up to and including the final `|`, shared by all nonces.
    ///
    /// The search loop appends the nonce digits to this prefix instead of
    /// re-encoding the whole header per attempt.
    pub fn encode_prefix(&self) -> Vec<u8> {
        format!(
            "{}|{}|{}|",
            self.block_number,
            self.transactions.join(";"),
            self.previous_hash
        )
        .into_bytes()
    }

    /// SHA-256 of the canonical header bytes, hex encoded
    pub fn hash(&self) -> String {
        hex::encode(Sha256::digest(self.encode()))
    }
}

/// Parse a comma-separated transactions string such as `"A->B->20,C->D->45"`.
///
/// Each entry must have the form `from->to->amount` with a numeric amount.
pub fn parse_transactions(s: &str) -> Result<Vec<String>> {
    if s.trim().is_empty() {
        return Err(Error::config("transactions string is empty"));
    }

    let mut transactions = Vec::new();
    for entry in s.split(',') {
        let entry = entry.trim();
        let parts: Vec<&str> = entry.split("->").collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(Error::config(format!(
                "malformed transaction entry {:?}: expected from->to->amount",
                entry
            )));
        }
        parts[2].parse::<f64>().map_err(|_| {
            Error::config(format!(
                "malformed transaction entry {:?}: amount {:?} is not a number",
                entry, parts[2]
            ))
        })?;
        transactions.push(entry.to_string());
    }

    Ok(transactions)
}
