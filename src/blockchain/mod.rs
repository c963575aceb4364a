pub mod block;
pub mod chain;
pub mod transaction;

pub use block::{Block, CommittedTransaction};
pub use chain::BlockLedger;
pub use transaction::{Proposal, SignedProposal, TransactionCall, Transfer};
