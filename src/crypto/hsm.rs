use super::keys;
use ed25519_dalek::{SigningKey, VerifyingKey};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Software stand-in for the CA's hardware security module. Keys never
/// leave it; callers get signatures and public keys by label.
pub struct HardwareSecurityModule {
    keys: Arc<RwLock<HashMap<String, SigningKey>>>,
}

impl HardwareSecurityModule {
    pub fn new() -> Self {
        Self {
            keys: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Installs a key derived from `seed` under `label`, replacing any
    /// previous one.
    pub async fn derive_keypair(&self, label: &str, seed: &[u8]) -> VerifyingKey {
        let signing_key = keys::derive_signing_key(seed);
        let public_key = signing_key.verifying_key();

        self.keys
            .write()
            .await
            .insert(label.to_string(), signing_key);
        log::debug!("HSM keypair derived: {}", label);

        public_key
    }

    pub async fn public_key(&self, label: &str) -> Option<VerifyingKey> {
        self.keys
            .read()
            .await
            .get(label)
            .map(SigningKey::verifying_key)
    }

    pub async fn sign(&self, label: &str, data: &[u8]) -> Result<String, HsmError> {
        let keys = self.keys.read().await;
        let Some(key) = keys.get(label) else {
            return Err(HsmError::UnknownKey(label.to_string()));
        };
        Ok(keys::sign_hex(key, data))
    }
}

impl Default for HardwareSecurityModule {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HsmError {
    #[error("key {0} not found in HSM")]
    UnknownKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signs_with_installed_key() {
        let hsm = HardwareSecurityModule::new();
        let public = hsm.derive_keypair("ca-org1", b"seed").await;
        let signature = hsm.sign("ca-org1", b"payload").await.unwrap();
        assert!(keys::verify_hex(&public, b"payload", &signature).is_ok());
        assert_eq!(hsm.public_key("ca-org1").await, Some(public));
    }

    #[tokio::test]
    async fn unknown_label_is_an_error() {
        let hsm = HardwareSecurityModule::new();
        assert!(matches!(
            hsm.sign("missing", b"payload").await,
            Err(HsmError::UnknownKey(_))
        ));
    }
}
