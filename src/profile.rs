//! Connection profiles: the static description of how to reach the network
//! (peers, orderers, certificate authorities and their TLS material).

use crate::config::AppConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("connection profile not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read connection profile {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid connection profile: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("certificate authority {0} is not defined in the connection profile")]
    UnknownCa(String),
    #[error("no organization with MSP id {0} in the connection profile")]
    UnknownMsp(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PemBundle {
    Single(String),
    Many(Vec<String>),
}

impl PemBundle {
    pub fn certificates(&self) -> Vec<&str> {
        match self {
            PemBundle::Single(pem) => vec![pem.as_str()],
            PemBundle::Many(pems) => pems.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsCaCerts {
    pub pem: PemBundle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSection {
    pub organization: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub mspid: String,
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default)]
    pub certificate_authorities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub url: String,
    #[serde(rename = "tlsCACerts", default, skip_serializing_if = "Option::is_none")]
    pub tls_ca_certs: Option<TlsCaCerts>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub grpc_options: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpOptions {
    pub verify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaEntry {
    pub url: String,
    pub ca_name: String,
    #[serde(rename = "tlsCACerts", default, skip_serializing_if = "Option::is_none")]
    pub tls_ca_certs: Option<TlsCaCerts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_options: Option<HttpOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    pub name: String,
    pub version: String,
    pub client: ClientSection,
    pub organizations: BTreeMap<String, Organization>,
    #[serde(default)]
    pub peers: BTreeMap<String, Endpoint>,
    #[serde(default)]
    pub orderers: BTreeMap<String, Endpoint>,
    #[serde(default)]
    pub certificate_authorities: BTreeMap<String, CaEntry>,
}

impl ConnectionProfile {
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        if !path.exists() {
            return Err(ProfileError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let profile = serde_json::from_str(&contents)?;
        log::debug!("Loaded connection profile from {}", path.display());
        Ok(profile)
    }

    /// Topology of the single-organization test network.
    pub fn org1_default() -> Self {
        let peer_name = "peer0.org1.example.com".to_string();
        let ca_name = "ca.org1.example.com".to_string();

        let mut grpc_options = BTreeMap::new();
        grpc_options.insert(
            "ssl-target-name-override".to_string(),
            serde_json::Value::String(peer_name.clone()),
        );

        let mut organizations = BTreeMap::new();
        organizations.insert(
            "Org1".to_string(),
            Organization {
                mspid: "Org1MSP".to_string(),
                peers: vec![peer_name.clone()],
                certificate_authorities: vec![ca_name.clone()],
            },
        );

        let mut peers = BTreeMap::new();
        peers.insert(
            peer_name,
            Endpoint {
                url: "grpcs://localhost:7051".to_string(),
                tls_ca_certs: None,
                grpc_options,
            },
        );

        let mut orderers = BTreeMap::new();
        orderers.insert(
            "orderer.example.com".to_string(),
            Endpoint {
                url: "grpcs://localhost:7050".to_string(),
                tls_ca_certs: None,
                grpc_options: BTreeMap::new(),
            },
        );

        let mut certificate_authorities = BTreeMap::new();
        certificate_authorities.insert(
            ca_name,
            CaEntry {
                url: "https://localhost:7054".to_string(),
                ca_name: "ca-org1".to_string(),
                tls_ca_certs: None,
                http_options: Some(HttpOptions { verify: false }),
            },
        );

        Self {
            name: "test-network-org1".to_string(),
            version: "1.0.0".to_string(),
            client: ClientSection {
                organization: "Org1".to_string(),
            },
            organizations,
            peers,
            orderers,
            certificate_authorities,
        }
    }

    pub fn ca(&self, host_name: &str) -> Result<&CaEntry, ProfileError> {
        self.certificate_authorities
            .get(host_name)
            .ok_or_else(|| ProfileError::UnknownCa(host_name.to_string()))
    }

    pub fn organization_for_msp(&self, msp_id: &str) -> Result<&Organization, ProfileError> {
        self.organizations
            .values()
            .find(|org| org.mspid == msp_id)
            .ok_or_else(|| ProfileError::UnknownMsp(msp_id.to_string()))
    }

    pub fn msp_ids(&self) -> Vec<String> {
        self.organizations.values().map(|org| org.mspid.clone()).collect()
    }
}

/// Loads the profile named by the config, or the built-in Org1 topology.
pub fn build_profile(config: &AppConfig) -> Result<ConnectionProfile, ProfileError> {
    match &config.connection_profile {
        Some(path) => ConnectionProfile::load(path),
        None => Ok(ConnectionProfile::org1_default()),
    }
}
