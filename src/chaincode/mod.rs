pub mod asset_transfer;
pub mod stub;

pub use asset_transfer::AssetTransfer;
pub use stub::{ChaincodeStub, WorldState};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChaincodeError {
    #[error("function {0} is not defined by the contract")]
    UnknownFunction(String),
    #[error("{function} expects {expected} arguments, got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },
    #[error("{0}")]
    Contract(String),
}

/// A deployed contract as executed by an endorsing peer.
pub trait Chaincode: Send + Sync {
    fn invoke(
        &self,
        stub: &mut ChaincodeStub<'_>,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ChaincodeError>;
}
