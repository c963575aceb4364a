use super::certificate::{Certificate, IdentityRole};
use crate::crypto::{HardwareSecurityModule, HsmError, keys};
use crate::profile::CaEntry;
use crate::wallet::Identity;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use ed25519_dalek::VerifyingKey;
use rand::RngCore;
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

pub const BOOTSTRAP_ADMIN_ID: &str = "admin";
pub const BOOTSTRAP_ADMIN_SECRET: &str = "adminpw";
const CERTIFICATE_VALIDITY_DAYS: i64 = 365;

#[derive(Debug, Error)]
pub enum CaError {
    #[error("identity {0} is not registered")]
    NotRegistered(String),
    #[error("identity {0} is already registered")]
    AlreadyRegistered(String),
    #[error("authentication failure for {0}")]
    InvalidSecret(String),
    #[error("identity {0} has reached its enrollment limit")]
    EnrollmentLimit(String),
    #[error("registrar {0} is not authorized to register identities")]
    NotAuthorized(String),
    #[error("registrar certificate was not issued by {0}")]
    UntrustedRegistrar(String),
    #[error("malformed enrollment public key")]
    BadPublicKey,
    #[error("CA signing failed: {0}")]
    Signing(#[from] HsmError),
}

pub type CaResult<T> = Result<T, CaError>;

#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    pub enrollment_id: String,
    pub secret: String,
    /// Hex-encoded public key the certificate is issued for.
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub enrollment_id: String,
    pub affiliation: Option<String>,
    pub role: IdentityRole,
    /// Generated by the CA when absent.
    pub secret: Option<String>,
    /// `None` means unlimited.
    pub max_enrollments: Option<u32>,
}

impl RegistrationRequest {
    pub fn client(enrollment_id: &str, affiliation: &str) -> Self {
        Self {
            enrollment_id: enrollment_id.to_string(),
            affiliation: Some(affiliation.to_string()),
            role: IdentityRole::Client,
            secret: None,
            max_enrollments: None,
        }
    }
}

/// The client side of a certificate authority.
#[async_trait]
pub trait CaClient: Send + Sync {
    fn ca_name(&self) -> &str;
    /// Key that every certificate issued by this CA verifies against.
    fn root_key(&self) -> VerifyingKey;
    async fn enroll(&self, request: &EnrollmentRequest) -> CaResult<Certificate>;
    /// Returns the enrollment secret.
    async fn register(&self, registrar: &Identity, request: &RegistrationRequest)
    -> CaResult<String>;
}

#[derive(Debug, Clone)]
struct Registration {
    secret: String,
    role: IdentityRole,
    affiliation: Option<String>,
    max_enrollments: Option<u32>,
    enrollments: u32,
}

/// An in-process certificate authority. Its signing key is derived from the
/// CA name, so separate runs issue certificates under the same root.
pub struct InMemoryCa {
    pub ca_name: String,
    hsm: Arc<HardwareSecurityModule>,
    root_key: VerifyingKey,
    registry: Arc<RwLock<HashMap<String, Registration>>>,
    next_serial: AtomicU64,
    registrations: AtomicUsize,
    enrollments: AtomicUsize,
}

impl InMemoryCa {
    pub async fn new(ca_name: &str, url: &str, hsm: Arc<HardwareSecurityModule>) -> Self {
        let root_key = hsm
            .derive_keypair(ca_name, format!("fabric-ca:{}", ca_name).as_bytes())
            .await;

        let mut registry = HashMap::new();
        registry.insert(
            BOOTSTRAP_ADMIN_ID.to_string(),
            Registration {
                secret: BOOTSTRAP_ADMIN_SECRET.to_string(),
                role: IdentityRole::Admin,
                affiliation: None,
                max_enrollments: None,
                enrollments: 0,
            },
        );

        log::debug!("CA {} ready at {}", ca_name, url);
        Self {
            ca_name: ca_name.to_string(),
            hsm,
            root_key,
            registry: Arc::new(RwLock::new(registry)),
            next_serial: AtomicU64::new(1),
            registrations: AtomicUsize::new(0),
            enrollments: AtomicUsize::new(0),
        }
    }

    /// Builds the CA described by a connection-profile entry.
    pub async fn from_profile(entry: &CaEntry) -> Self {
        if entry.http_options.as_ref().is_some_and(|o| !o.verify) {
            log::warn!("TLS verification disabled for CA {}", entry.ca_name);
        }
        Self::new(
            &entry.ca_name,
            &entry.url,
            Arc::new(HardwareSecurityModule::new()),
        )
        .await
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.load(Ordering::Relaxed)
    }

    pub fn enrollment_count(&self) -> usize {
        self.enrollments.load(Ordering::Relaxed)
    }

    async fn issue_certificate(
        &self,
        subject: &str,
        registration: &Registration,
        public_key: &str,
    ) -> CaResult<Certificate> {
        let serial = format!("{:016x}", self.next_serial.fetch_add(1, Ordering::Relaxed));
        let issued_at = Utc::now();
        let mut cert = Certificate {
            serial,
            subject: subject.to_string(),
            role: registration.role,
            affiliation: registration.affiliation.clone(),
            public_key: public_key.to_string(),
            issuer: self.ca_name.clone(),
            issued_at,
            expires_at: issued_at + Duration::days(CERTIFICATE_VALIDITY_DAYS),
            signature: String::new(),
        };
        cert.signature = self.hsm.sign(&self.ca_name, &cert.tbs_bytes()).await?;
        Ok(cert)
    }
}

#[async_trait]
impl CaClient for InMemoryCa {
    fn ca_name(&self) -> &str {
        &self.ca_name
    }

    fn root_key(&self) -> VerifyingKey {
        self.root_key
    }

    async fn enroll(&self, request: &EnrollmentRequest) -> CaResult<Certificate> {
        keys::verifying_key_from_hex(&request.public_key).map_err(|_| CaError::BadPublicKey)?;

        let registration = {
            let mut registry = self.registry.write().await;
            let Some(entry) = registry.get_mut(&request.enrollment_id) else {
                return Err(CaError::NotRegistered(request.enrollment_id.clone()));
            };
            if entry.secret != request.secret {
                return Err(CaError::InvalidSecret(request.enrollment_id.clone()));
            }
            if entry
                .max_enrollments
                .is_some_and(|max| entry.enrollments >= max)
            {
                return Err(CaError::EnrollmentLimit(request.enrollment_id.clone()));
            }
            entry.enrollments += 1;
            entry.clone()
        };

        let cert = self
            .issue_certificate(&request.enrollment_id, &registration, &request.public_key)
            .await?;
        self.enrollments.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "CA {} enrolled {} (serial {})",
            self.ca_name,
            request.enrollment_id,
            cert.serial
        );
        Ok(cert)
    }

    async fn register(
        &self,
        registrar: &Identity,
        request: &RegistrationRequest,
    ) -> CaResult<String> {
        let registrar_cert = registrar.certificate();
        if registrar_cert.issuer != self.ca_name
            || registrar_cert.verify(&self.root_key).is_err()
            || registrar_cert.is_expired()
        {
            return Err(CaError::UntrustedRegistrar(self.ca_name.clone()));
        }
        if registrar_cert.role != IdentityRole::Admin {
            return Err(CaError::NotAuthorized(registrar_cert.subject.clone()));
        }

        let mut registry = self.registry.write().await;
        if registry.contains_key(&request.enrollment_id) {
            return Err(CaError::AlreadyRegistered(request.enrollment_id.clone()));
        }

        let secret = request.secret.clone().unwrap_or_else(|| {
            let mut bytes = [0u8; 12];
            OsRng.fill_bytes(&mut bytes);
            hex::encode(bytes)
        });
        registry.insert(
            request.enrollment_id.clone(),
            Registration {
                secret: secret.clone(),
                role: request.role,
                affiliation: request.affiliation.clone(),
                max_enrollments: request.max_enrollments,
                enrollments: 0,
            },
        );
        drop(registry);

        self.registrations.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "CA {} registered {} on behalf of {}",
            self.ca_name,
            request.enrollment_id,
            registrar_cert.subject
        );
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    async fn ca() -> InMemoryCa {
        InMemoryCa::new(
            "ca-org1",
            "https://localhost:7054",
            Arc::new(HardwareSecurityModule::new()),
        )
        .await
    }

    async fn enroll(ca: &InMemoryCa, id: &str, secret: &str) -> CaResult<Identity> {
        let key = keys::generate_signing_key();
        let request = EnrollmentRequest {
            enrollment_id: id.to_string(),
            secret: secret.to_string(),
            public_key: keys::encode_verifying_key(&key.verifying_key()),
        };
        let cert = ca.enroll(&request).await?;
        Ok(Identity::x509("Org1MSP", cert, &key))
    }

    #[tokio::test]
    async fn bootstrap_admin_enrolls_with_default_secret() {
        let ca = ca().await;
        let admin = assert_ok!(enroll(&ca, BOOTSTRAP_ADMIN_ID, BOOTSTRAP_ADMIN_SECRET).await);
        let cert = admin.certificate();
        assert_eq!(cert.role, IdentityRole::Admin);
        assert_eq!(cert.issuer, "ca-org1");
        assert!(cert.verify(&ca.root_key()).is_ok());
        assert_eq!(ca.enrollment_count(), 1);
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let ca = ca().await;
        let err = assert_err!(enroll(&ca, BOOTSTRAP_ADMIN_ID, "nope").await);
        assert!(matches!(err, CaError::InvalidSecret(_)));
        assert_eq!(ca.enrollment_count(), 0);
    }

    #[tokio::test]
    async fn registered_user_enrolls_with_returned_secret() {
        let ca = ca().await;
        let admin = enroll(&ca, BOOTSTRAP_ADMIN_ID, BOOTSTRAP_ADMIN_SECRET)
            .await
            .unwrap();
        let secret = ca
            .register(&admin, &RegistrationRequest::client("appUser", "org1.department1"))
            .await
            .unwrap();

        let user = enroll(&ca, "appUser", &secret).await.unwrap();
        assert_eq!(user.certificate().role, IdentityRole::Client);
        assert_eq!(
            user.certificate().affiliation.as_deref(),
            Some("org1.department1")
        );
        assert_eq!(ca.registration_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let ca = ca().await;
        let admin = enroll(&ca, BOOTSTRAP_ADMIN_ID, BOOTSTRAP_ADMIN_SECRET)
            .await
            .unwrap();
        let request = RegistrationRequest::client("appUser", "org1.department1");
        ca.register(&admin, &request).await.unwrap();
        assert!(matches!(
            ca.register(&admin, &request).await,
            Err(CaError::AlreadyRegistered(_))
        ));
    }

    #[tokio::test]
    async fn only_admins_register() {
        let ca = ca().await;
        let admin = enroll(&ca, BOOTSTRAP_ADMIN_ID, BOOTSTRAP_ADMIN_SECRET)
            .await
            .unwrap();
        let secret = ca
            .register(&admin, &RegistrationRequest::client("appUser", "org1"))
            .await
            .unwrap();
        let user = enroll(&ca, "appUser", &secret).await.unwrap();

        let err = ca
            .register(&user, &RegistrationRequest::client("other", "org1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaError::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn foreign_registrar_is_untrusted() {
        let ours = ca().await;
        let theirs = InMemoryCa::new(
            "ca-org2",
            "https://localhost:8054",
            Arc::new(HardwareSecurityModule::new()),
        )
        .await;
        let foreign_admin = enroll(&theirs, BOOTSTRAP_ADMIN_ID, BOOTSTRAP_ADMIN_SECRET)
            .await
            .unwrap();
        assert!(matches!(
            ours.register(&foreign_admin, &RegistrationRequest::client("x", "org1"))
                .await,
            Err(CaError::UntrustedRegistrar(_))
        ));
    }

    #[tokio::test]
    async fn enrollment_limit_is_enforced() {
        let ca = ca().await;
        let admin = enroll(&ca, BOOTSTRAP_ADMIN_ID, BOOTSTRAP_ADMIN_SECRET)
            .await
            .unwrap();
        let request = RegistrationRequest {
            secret: Some("s3cret".to_string()),
            max_enrollments: Some(1),
            ..RegistrationRequest::client("once", "org1")
        };
        ca.register(&admin, &request).await.unwrap();
        enroll(&ca, "once", "s3cret").await.unwrap();
        assert!(matches!(
            enroll(&ca, "once", "s3cret").await,
            Err(CaError::EnrollmentLimit(_))
        ));
    }

    #[tokio::test]
    async fn separate_instances_share_a_root() {
        let a = ca().await;
        let b = ca().await;
        assert_eq!(a.root_key(), b.root_key());
    }
}
