pub mod identity;
pub mod store;

pub use identity::{Credentials, Identity};
pub use store::{FileSystemWallet, InMemoryWallet, WalletError, WalletResult, WalletStore};
