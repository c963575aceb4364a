pub mod blockchain;
pub mod chaincode;
pub mod config;
pub mod crypto;
pub mod driver;
pub mod network;
pub mod pki;
pub mod profile;
pub mod wallet;
