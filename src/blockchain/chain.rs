use super::block::{Block, CommittedTransaction};
use super::transaction::TransactionCall;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Committed blocks of one channel, each linked to its predecessor's hash.
pub struct BlockLedger {
    pub chain: Arc<RwLock<Vec<Block>>>,
}

impl BlockLedger {
    pub fn new() -> Self {
        Self {
            chain: Arc::new(RwLock::new(vec![Block::genesis()])),
        }
    }

    /// Orders the transactions into a new block and returns its number.
    pub async fn append(&self, transactions: Vec<CommittedTransaction>) -> u64 {
        let mut chain = self.chain.write().await;
        let (number, previous_hash) = match chain.last() {
            Some(tip) => (tip.number + 1, tip.hash.clone()),
            None => (0, super::block::GENESIS_PREVIOUS_HASH.to_string()),
        };
        chain.push(Block::new(number, transactions, previous_hash));
        number
    }

    pub async fn height(&self) -> u64 {
        self.chain.read().await.len() as u64
    }

    pub async fn verify_chain(&self) -> bool {
        let chain = self.chain.read().await;
        chain.iter().all(|b| b.hash == b.calculate_hash())
            && chain
                .windows(2)
                .all(|w| w[1].previous_hash == w[0].hash && w[1].number == w[0].number + 1)
    }

    /// Calls of every committed transaction, in commit order.
    pub async fn committed_calls(&self) -> Vec<TransactionCall> {
        self.chain
            .read()
            .await
            .iter()
            .flat_map(|b| b.transactions.iter())
            .map(|tx| tx.proposal.proposal.call.clone())
            .collect()
    }
}

impl Default for BlockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::SignedProposal;
    use crate::crypto::keys;
    use crate::pki::{Certificate, IdentityRole};
    use crate::wallet::Identity;
    use chrono::{Duration, Utc};

    fn committed(function: &str) -> CommittedTransaction {
        let key = keys::generate_signing_key();
        let now = Utc::now();
        let cert = Certificate {
            serial: "03".to_string(),
            subject: "appUser".to_string(),
            role: IdentityRole::Client,
            affiliation: None,
            public_key: keys::encode_verifying_key(&key.verifying_key()),
            issuer: "ca-org1".to_string(),
            issued_at: now,
            expires_at: now + Duration::days(1),
            signature: String::new(),
        };
        let identity = Identity::x509("Org1MSP", cert, &key);
        CommittedTransaction {
            proposal: SignedProposal::new(
                &identity,
                "mychannel",
                "basic",
                &TransactionCall::new(function, &[]),
            )
            .unwrap(),
            writes: vec![("k".to_string(), b"v".to_vec())],
        }
    }

    #[tokio::test]
    async fn appended_blocks_link_to_their_parent() {
        let ledger = BlockLedger::new();
        assert_eq!(ledger.append(vec![committed("InitLedger")]).await, 1);
        assert_eq!(ledger.append(vec![committed("Transfer")]).await, 2);
        assert_eq!(ledger.height().await, 3);
        assert!(ledger.verify_chain().await);

        let functions: Vec<String> = ledger
            .committed_calls()
            .await
            .into_iter()
            .map(|c| c.function)
            .collect();
        assert_eq!(functions, vec!["InitLedger", "Transfer"]);
    }

    #[tokio::test]
    async fn rewriting_history_breaks_the_chain() {
        let ledger = BlockLedger::new();
        ledger.append(vec![committed("InitLedger")]).await;
        ledger.append(vec![committed("Transfer")]).await;
        ledger.chain.write().await[1].transactions[0].writes.clear();
        assert!(!ledger.verify_chain().await);
    }
}
