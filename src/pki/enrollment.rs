//! Puts the admin and the application user into a wallet, enrolling them
//! with the CA only when the wallet does not hold them yet.

use super::ca::{
    BOOTSTRAP_ADMIN_ID, BOOTSTRAP_ADMIN_SECRET, CaClient, CaError, EnrollmentRequest,
    RegistrationRequest,
};
use crate::crypto::keys;
use crate::wallet::{Identity, WalletError, WalletStore};
use thiserror::Error;

pub const ADMIN_LABEL: &str = BOOTSTRAP_ADMIN_ID;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled,
    AlreadyEnrolled,
}

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("an identity for the admin user must exist in the wallet before registering {0}")]
    MissingAdmin(String),
    #[error(transparent)]
    Ca(#[from] CaError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

async fn enroll_into_wallet(
    ca: &dyn CaClient,
    wallet: &dyn WalletStore,
    msp_id: &str,
    enrollment_id: &str,
    secret: &str,
) -> Result<Identity, EnrollmentError> {
    let signing_key = keys::generate_signing_key();
    let request = EnrollmentRequest {
        enrollment_id: enrollment_id.to_string(),
        secret: secret.to_string(),
        public_key: keys::encode_verifying_key(&signing_key.verifying_key()),
    };
    let certificate = ca.enroll(&request).await?;
    let identity = Identity::x509(msp_id, certificate, &signing_key);
    wallet.put(enrollment_id, &identity).await?;
    Ok(identity)
}

pub async fn enroll_admin(
    ca: &dyn CaClient,
    wallet: &dyn WalletStore,
    msp_id: &str,
) -> Result<EnrollOutcome, EnrollmentError> {
    if wallet.get(ADMIN_LABEL).await?.is_some() {
        println!("  → Admin identity already exists in the wallet");
        return Ok(EnrollOutcome::AlreadyEnrolled);
    }

    enroll_into_wallet(ca, wallet, msp_id, ADMIN_LABEL, BOOTSTRAP_ADMIN_SECRET).await?;
    println!("  ✓ Enrolled admin and imported it into the wallet");
    Ok(EnrollOutcome::Enrolled)
}

pub async fn register_and_enroll_user(
    ca: &dyn CaClient,
    wallet: &dyn WalletStore,
    msp_id: &str,
    user_id: &str,
    affiliation: &str,
) -> Result<EnrollOutcome, EnrollmentError> {
    if wallet.get(user_id).await?.is_some() {
        println!("  → Identity for user {} already exists in the wallet", user_id);
        return Ok(EnrollOutcome::AlreadyEnrolled);
    }

    let Some(admin) = wallet.get(ADMIN_LABEL).await? else {
        return Err(EnrollmentError::MissingAdmin(user_id.to_string()));
    };

    let secret = ca
        .register(&admin, &RegistrationRequest::client(user_id, affiliation))
        .await?;
    enroll_into_wallet(ca, wallet, msp_id, user_id, &secret).await?;
    println!(
        "  ✓ Registered and enrolled user {} and imported it into the wallet",
        user_id
    );
    Ok(EnrollOutcome::Enrolled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::HardwareSecurityModule;
    use crate::pki::InMemoryCa;
    use crate::wallet::InMemoryWallet;
    use std::sync::Arc;

    async fn ca() -> InMemoryCa {
        InMemoryCa::new(
            "ca-org1",
            "https://localhost:7054",
            Arc::new(HardwareSecurityModule::new()),
        )
        .await
    }

    #[tokio::test]
    async fn enrolls_admin_then_user_once() {
        let ca = ca().await;
        let wallet = InMemoryWallet::new();

        assert_eq!(
            enroll_admin(&ca, &wallet, "Org1MSP").await.unwrap(),
            EnrollOutcome::Enrolled
        );
        assert_eq!(
            register_and_enroll_user(&ca, &wallet, "Org1MSP", "appUser", "org1.department1")
                .await
                .unwrap(),
            EnrollOutcome::Enrolled
        );

        assert_eq!(
            enroll_admin(&ca, &wallet, "Org1MSP").await.unwrap(),
            EnrollOutcome::AlreadyEnrolled
        );
        assert_eq!(
            register_and_enroll_user(&ca, &wallet, "Org1MSP", "appUser", "org1.department1")
                .await
                .unwrap(),
            EnrollOutcome::AlreadyEnrolled
        );

        assert_eq!(ca.enrollment_count(), 2);
        assert_eq!(ca.registration_count(), 1);
        let user = wallet.get("appUser").await.unwrap().unwrap();
        assert_eq!(user.msp_id, "Org1MSP");
        assert!(user.certificate().verify(&ca.root_key()).is_ok());
    }

    #[tokio::test]
    async fn user_enrollment_needs_admin_in_wallet() {
        let ca = ca().await;
        let wallet = InMemoryWallet::new();
        let err = register_and_enroll_user(&ca, &wallet, "Org1MSP", "appUser", "org1")
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentError::MissingAdmin(_)));
        assert_eq!(ca.registration_count(), 0);
    }
}
