use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CryptoError {
    #[error("invalid hex encoding: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("expected a {expected}-byte {what}, got {actual} bytes")]
    Length {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("malformed public key")]
    PublicKey,
    #[error("signature verification failed")]
    BadSignature,
    #[error("transaction id does not match nonce and creator")]
    TxIdMismatch,
}

pub fn generate_signing_key() -> SigningKey {
    let mut csprng = OsRng;
    SigningKey::generate(&mut csprng)
}

/// Same seed, same key. Used where separate processes must agree on a root.
pub fn derive_signing_key(seed: &[u8]) -> SigningKey {
    let digest: [u8; 32] = Sha256::digest(seed).into();
    SigningKey::from_bytes(&digest)
}

pub fn encode_signing_key(key: &SigningKey) -> String {
    hex::encode(key.to_bytes())
}

pub fn encode_verifying_key(key: &VerifyingKey) -> String {
    hex::encode(key.to_bytes())
}

pub fn signing_key_from_hex(encoded: &str) -> Result<SigningKey, CryptoError> {
    let bytes = fixed::<32>(encoded, "private key")?;
    Ok(SigningKey::from_bytes(&bytes))
}

pub fn verifying_key_from_hex(encoded: &str) -> Result<VerifyingKey, CryptoError> {
    let bytes = fixed::<32>(encoded, "public key")?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::PublicKey)
}

pub fn sign_hex(key: &SigningKey, data: &[u8]) -> String {
    hex::encode(key.sign(data).to_bytes())
}

pub fn verify_hex(key: &VerifyingKey, data: &[u8], signature: &str) -> Result<(), CryptoError> {
    let bytes = fixed::<64>(signature, "signature")?;
    let signature = Signature::from_bytes(&bytes);
    key.verify(data, &signature)
        .map_err(|_| CryptoError::BadSignature)
}

fn fixed<const N: usize>(encoded: &str, what: &'static str) -> Result<[u8; N], CryptoError> {
    let bytes = hex::decode(encoded)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| CryptoError::Length {
        what,
        expected: N,
        actual: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_keys_are_stable() {
        let a = derive_signing_key(b"ca.org1.example.com");
        let b = derive_signing_key(b"ca.org1.example.com");
        let c = derive_signing_key(b"ca.org2.example.com");
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_ne!(a.to_bytes(), c.to_bytes());
    }

    #[test]
    fn signatures_verify_only_for_the_signed_data() {
        let key = generate_signing_key();
        let signature = sign_hex(&key, b"Transfer");
        assert!(verify_hex(&key.verifying_key(), b"Transfer", &signature).is_ok());
        assert_eq!(
            verify_hex(&key.verifying_key(), b"InitLedger", &signature),
            Err(CryptoError::BadSignature)
        );
    }

    #[test]
    fn hex_keys_survive_storage() {
        let key = generate_signing_key();
        let restored = signing_key_from_hex(&encode_signing_key(&key)).unwrap();
        assert_eq!(restored.to_bytes(), key.to_bytes());
        let public = verifying_key_from_hex(&encode_verifying_key(&key.verifying_key())).unwrap();
        assert_eq!(public, key.verifying_key());
    }

    #[test]
    fn short_keys_are_rejected() {
        let err = signing_key_from_hex("abcd").unwrap_err();
        assert!(matches!(err, CryptoError::Length { expected: 32, actual: 2, .. }));
        assert!(matches!(signing_key_from_hex("zz"), Err(CryptoError::Hex(_))));
    }
}
