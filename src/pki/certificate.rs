use crate::crypto::CryptoError;
use crate::crypto::keys;
use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdentityRole {
    Admin,
    Client,
    Peer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub serial: String,
    pub subject: String,
    pub role: IdentityRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    /// Hex-encoded Ed25519 public key of the subject.
    pub public_key: String,
    pub issuer: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Issuer signature over every other field.
    pub signature: String,
}

#[derive(Serialize)]
struct TbsCertificate<'a> {
    serial: &'a str,
    subject: &'a str,
    role: IdentityRole,
    affiliation: Option<&'a str>,
    public_key: &'a str,
    issuer: &'a str,
    issued_at: &'a DateTime<Utc>,
    expires_at: &'a DateTime<Utc>,
}

impl Certificate {
    /// The bytes the issuer signs.
    pub fn tbs_bytes(&self) -> Vec<u8> {
        let tbs = TbsCertificate {
            serial: &self.serial,
            subject: &self.subject,
            role: self.role,
            affiliation: self.affiliation.as_deref(),
            public_key: &self.public_key,
            issuer: &self.issuer,
            issued_at: &self.issued_at,
            expires_at: &self.expires_at,
        };
        serde_json::to_vec(&tbs).unwrap_or_default()
    }

    pub fn verify(&self, issuer_key: &VerifyingKey) -> Result<(), CryptoError> {
        keys::verify_hex(issuer_key, &self.tbs_bytes(), &self.signature)
    }

    pub fn subject_key(&self) -> Result<VerifyingKey, CryptoError> {
        keys::verifying_key_from_hex(&self.public_key)
    }

    pub fn is_valid(&self) -> bool {
        self.issued_at <= Utc::now() && !self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signed(issuer: &ed25519_dalek::SigningKey) -> Certificate {
        let subject = keys::generate_signing_key();
        let issued_at = Utc::now();
        let mut cert = Certificate {
            serial: "01".to_string(),
            subject: "appUser".to_string(),
            role: IdentityRole::Client,
            affiliation: Some("org1.department1".to_string()),
            public_key: keys::encode_verifying_key(&subject.verifying_key()),
            issuer: "ca-org1".to_string(),
            issued_at,
            expires_at: issued_at + Duration::days(365),
            signature: String::new(),
        };
        cert.signature = keys::sign_hex(issuer, &cert.tbs_bytes());
        cert
    }

    #[test]
    fn verifies_against_issuer_key() {
        let issuer = keys::generate_signing_key();
        let cert = signed(&issuer);
        assert!(cert.verify(&issuer.verifying_key()).is_ok());
        assert!(cert.is_valid());

        let other = keys::generate_signing_key();
        assert!(cert.verify(&other.verifying_key()).is_err());
    }

    #[test]
    fn tampered_fields_break_the_signature() {
        let issuer = keys::generate_signing_key();
        let mut cert = signed(&issuer);
        cert.role = IdentityRole::Admin;
        assert_eq!(
            cert.verify(&issuer.verifying_key()),
            Err(CryptoError::BadSignature)
        );
    }

    #[test]
    fn expiry_is_reported() {
        let issuer = keys::generate_signing_key();
        let mut cert = signed(&issuer);
        cert.expires_at = Utc::now() - Duration::seconds(1);
        assert!(cert.is_expired());
        assert!(!cert.is_valid());
    }
}
