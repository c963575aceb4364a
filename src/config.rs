use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_CHANNEL_NAME: &str = "mychannel";
pub const DEFAULT_CHAINCODE_NAME: &str = "basic";
pub const DEFAULT_WALLET_PATH: &str = "wallet";
pub const DEFAULT_MSP_ID: &str = "Org1MSP";
pub const DEFAULT_CA_HOST_NAME: &str = "ca.org1.example.com";
pub const DEFAULT_APP_USER_ID: &str = "appUser";
pub const DEFAULT_APP_USER_AFFILIATION: &str = "org1.department1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must not contain whitespace: {value:?}")]
    Whitespace { key: &'static str, value: String },
}

/// Settings resolved once at startup. Nothing else in the crate reads the
/// process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub channel_name: String,
    pub chaincode_name: String,
    pub wallet_path: PathBuf,
    pub connection_profile: Option<PathBuf>,
    pub msp_id: String,
    pub ca_host_name: String,
    pub app_user_id: String,
    pub app_user_affiliation: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            chaincode_name: DEFAULT_CHAINCODE_NAME.to_string(),
            wallet_path: PathBuf::from(DEFAULT_WALLET_PATH),
            connection_profile: None,
            msp_id: DEFAULT_MSP_ID.to_string(),
            ca_host_name: DEFAULT_CA_HOST_NAME.to_string(),
            app_user_id: DEFAULT_APP_USER_ID.to_string(),
            app_user_affiliation: DEFAULT_APP_USER_AFFILIATION.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let name = |key: &'static str, default: &str| -> Result<String, ConfigError> {
            match get(key) {
                Some(value) if value.chars().any(char::is_whitespace) => {
                    Err(ConfigError::Whitespace { key, value })
                }
                Some(value) => Ok(value),
                None => Ok(default.to_string()),
            }
        };

        Ok(Self {
            channel_name: name("CHANNEL_NAME", DEFAULT_CHANNEL_NAME)?,
            chaincode_name: name("CHAINCODE_NAME", DEFAULT_CHAINCODE_NAME)?,
            wallet_path: get("WALLET_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WALLET_PATH)),
            connection_profile: get("CONNECTION_PROFILE").map(PathBuf::from),
            msp_id: name("MSP_ID", DEFAULT_MSP_ID)?,
            ca_host_name: name("CA_HOST_NAME", DEFAULT_CA_HOST_NAME)?,
            app_user_id: name("APP_USER_ID", DEFAULT_APP_USER_ID)?,
            app_user_affiliation: name("APP_USER_AFFILIATION", DEFAULT_APP_USER_AFFILIATION)?,
        })
    }
}
