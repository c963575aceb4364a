pub mod hsm;
pub mod keys;

pub use hsm::{HardwareSecurityModule, HsmError};
pub use keys::CryptoError;
