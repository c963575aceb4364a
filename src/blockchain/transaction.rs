use crate::crypto::CryptoError;
use crate::pki::Certificate;
use crate::wallet::Identity;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A contract function name with its ordered string arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCall {
    pub function: String,
    pub args: Vec<String>,
}

impl TransactionCall {
    pub fn new(function: &str, args: &[&str]) -> Self {
        Self {
            function: function.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn init_ledger() -> Self {
        Self::new("InitLedger", &[])
    }
}

impl fmt::Display for TransactionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", arg)?;
        }
        write!(f, ")")
    }
}

/// Arguments of one `Transfer` call. Passed through to the contract as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub amount: &'a str,
}

impl Transfer<'_> {
    pub fn to_call(&self) -> TransactionCall {
        TransactionCall::new("Transfer", &[self.from, self.to, self.amount])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub tx_id: String,
    pub channel: String,
    pub chaincode: String,
    pub call: TransactionCall,
    pub creator_msp: String,
    pub creator: Certificate,
    pub nonce: String,
    pub timestamp: DateTime<Utc>,
}

impl Proposal {
    pub fn bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// A proposal plus the creator's signature over [`Proposal::bytes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedProposal {
    pub proposal: Proposal,
    pub signature: String,
}

/// `hex(sha256(nonce || creator))`.
pub fn compute_tx_id(nonce: &[u8], creator: &Certificate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(serde_json::to_vec(creator).unwrap_or_default());
    hex::encode(hasher.finalize())
}

impl SignedProposal {
    pub fn new(
        identity: &Identity,
        channel: &str,
        chaincode: &str,
        call: &TransactionCall,
    ) -> Result<Self, CryptoError> {
        let mut nonce = [0u8; 24];
        OsRng.fill_bytes(&mut nonce);
        let creator = identity.certificate().clone();

        let proposal = Proposal {
            tx_id: compute_tx_id(&nonce, &creator),
            channel: channel.to_string(),
            chaincode: chaincode.to_string(),
            call: call.clone(),
            creator_msp: identity.msp_id.clone(),
            creator,
            nonce: hex::encode(nonce),
            timestamp: Utc::now(),
        };
        let signature = identity.sign(&proposal.bytes())?;
        Ok(Self {
            proposal,
            signature,
        })
    }

    pub fn tx_id(&self) -> &str {
        &self.proposal.tx_id
    }

    /// Checks the tx id binding and the creator's signature. The creator
    /// certificate itself is checked by the caller against its MSP root.
    pub fn verify(&self) -> Result<(), CryptoError> {
        let nonce = hex::decode(&self.proposal.nonce)?;
        if compute_tx_id(&nonce, &self.proposal.creator) != self.proposal.tx_id {
            return Err(CryptoError::TxIdMismatch);
        }
        let creator_key = self.proposal.creator.subject_key()?;
        crate::crypto::keys::verify_hex(&creator_key, &self.proposal.bytes(), &self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys;
    use crate::pki::IdentityRole;
    use chrono::Duration;

    fn identity() -> Identity {
        let key = keys::generate_signing_key();
        let now = Utc::now();
        let cert = Certificate {
            serial: "02".to_string(),
            subject: "appUser".to_string(),
            role: IdentityRole::Client,
            affiliation: None,
            public_key: keys::encode_verifying_key(&key.verifying_key()),
            issuer: "ca-org1".to_string(),
            issued_at: now,
            expires_at: now + Duration::days(1),
            signature: String::new(),
        };
        Identity::x509("Org1MSP", cert, &key)
    }

    #[test]
    fn transfer_becomes_three_argument_call() {
        let call = Transfer {
            from: "7cafb40b30e8f7f0c8f57393e2ea63ff58a95907",
            to: "f5c705db130ec0cbda536bfacc8e38425b427862",
            amount: "7500000",
        }
        .to_call();
        assert_eq!(call.function, "Transfer");
        assert_eq!(
            call.args,
            vec![
                "7cafb40b30e8f7f0c8f57393e2ea63ff58a95907",
                "f5c705db130ec0cbda536bfacc8e38425b427862",
                "7500000"
            ]
        );
        assert_eq!(
            call.to_string(),
            "Transfer(\"7cafb40b30e8f7f0c8f57393e2ea63ff58a95907\", \"f5c705db130ec0cbda536bfacc8e38425b427862\", \"7500000\")"
        );
        assert_eq!(TransactionCall::init_ledger().to_string(), "InitLedger()");
    }

    #[test]
    fn signed_proposal_verifies() {
        let proposal =
            SignedProposal::new(&identity(), "mychannel", "basic", &TransactionCall::init_ledger())
                .unwrap();
        assert!(proposal.verify().is_ok());
        assert_eq!(proposal.tx_id().len(), 64);
    }

    #[test]
    fn altered_arguments_fail_verification() {
        let mut proposal = SignedProposal::new(
            &identity(),
            "mychannel",
            "basic",
            &TransactionCall::new("Transfer", &["a", "b", "1"]),
        )
        .unwrap();
        proposal.proposal.call.args[2] = "1000".to_string();
        assert!(proposal.verify().is_err());
    }

    #[test]
    fn rewritten_tx_id_is_rejected_before_the_signature() {
        let mut proposal =
            SignedProposal::new(&identity(), "mychannel", "basic", &TransactionCall::init_ledger())
                .unwrap();
        proposal.proposal.tx_id = "0".repeat(64);
        assert_eq!(proposal.verify(), Err(CryptoError::TxIdMismatch));
    }

    #[test]
    fn tx_ids_are_unique_per_proposal() {
        let id = identity();
        let call = TransactionCall::init_ledger();
        let a = SignedProposal::new(&id, "mychannel", "basic", &call).unwrap();
        let b = SignedProposal::new(&id, "mychannel", "basic", &call).unwrap();
        assert_ne!(a.tx_id(), b.tx_id());
    }
}
