use crate::crypto::CryptoError;
use crate::crypto::keys;
use crate::pki::Certificate;
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

pub const X509_IDENTITY: &str = "X.509";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub certificate: Certificate,
    /// Hex-encoded Ed25519 secret key.
    pub private_key: String,
}

/// An enrolled identity as kept in a wallet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub credentials: Credentials,
    pub msp_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: u32,
}

impl Identity {
    pub fn x509(msp_id: &str, certificate: Certificate, signing_key: &SigningKey) -> Self {
        Self {
            credentials: Credentials {
                certificate,
                private_key: keys::encode_signing_key(signing_key),
            },
            msp_id: msp_id.to_string(),
            kind: X509_IDENTITY.to_string(),
            version: 1,
        }
    }

    pub fn certificate(&self) -> &Certificate {
        &self.credentials.certificate
    }

    pub fn signing_key(&self) -> Result<SigningKey, CryptoError> {
        keys::signing_key_from_hex(&self.credentials.private_key)
    }

    pub fn sign(&self, data: &[u8]) -> Result<String, CryptoError> {
        Ok(keys::sign_hex(&self.signing_key()?, data))
    }
}
