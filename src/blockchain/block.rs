use super::transaction::SignedProposal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A transaction as ordered into a block, with the writes its endorsement
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedTransaction {
    pub proposal: SignedProposal,
    pub writes: Vec<(String, Vec<u8>)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub timestamp: DateTime<Utc>,
    pub transactions: Vec<CommittedTransaction>,
    pub previous_hash: String,
    pub hash: String,
}

impl Block {
    pub fn new(
        number: u64,
        transactions: Vec<CommittedTransaction>,
        previous_hash: String,
    ) -> Self {
        let mut block = Self {
            number,
            timestamp: Utc::now(),
            transactions,
            previous_hash,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    pub fn genesis() -> Self {
        Self::new(0, vec![], GENESIS_PREVIOUS_HASH.to_string())
    }

    pub fn calculate_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.number.to_be_bytes());
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        hasher.update(bincode::serialize(&self.transactions).unwrap_or_default());
        hasher.update(self.previous_hash.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
