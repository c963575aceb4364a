use crate::blockchain::{SignedProposal, TransactionCall};
use crate::chaincode::ChaincodeError;
use crate::crypto::CryptoError;
use crate::wallet::Identity;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway is not connected")]
    NotConnected,
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("channel {0} not found")]
    ChannelNotFound(String),
    #[error("discovery denied: {msp_id} is not a member of channel {channel}")]
    DiscoveryDenied { channel: String, msp_id: String },
    #[error("chaincode {chaincode} is not deployed on channel {channel}")]
    ChaincodeNotFound { channel: String, chaincode: String },
    #[error("endorsement of transaction {tx_id} failed")]
    Endorsement {
        tx_id: String,
        source: ChaincodeError,
    },
    #[error("failed to sign proposal: {0}")]
    Signing(#[from] CryptoError),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    pub enabled: bool,
    /// Rewrite discovered endpoints to localhost, for networks in containers.
    pub as_localhost: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub discovery: DiscoveryOptions,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            discovery: DiscoveryOptions {
                enabled: true,
                as_localhost: true,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub name: String,
    pub members: Vec<String>,
    pub peers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_id: String,
    pub block_number: u64,
    pub payload: Vec<u8>,
}

/// The wire side of a gateway session: whatever actually talks to peers and
/// orderers.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn connect(&self, identity: &Identity, options: &ConnectOptions)
    -> GatewayResult<SessionId>;
    async fn discover(&self, session: SessionId, channel: &str) -> GatewayResult<ChannelInfo>;
    /// Endorse, order and wait for commit.
    async fn submit_transaction(
        &self,
        session: SessionId,
        proposal: &SignedProposal,
    ) -> GatewayResult<TransactionReceipt>;
    /// Endorse only; nothing is ordered.
    async fn evaluate_transaction(
        &self,
        session: SessionId,
        proposal: &SignedProposal,
    ) -> GatewayResult<Vec<u8>>;
    fn disconnect(&self, session: SessionId);
}

/// An open session. Released by [`Gateway::disconnect`] or on drop,
/// whichever happens first.
pub struct Gateway {
    backend: Arc<dyn LedgerGateway>,
    identity: Identity,
    session: Option<SessionId>,
}

impl Gateway {
    pub async fn connect(
        backend: Arc<dyn LedgerGateway>,
        identity: Identity,
        options: &ConnectOptions,
    ) -> GatewayResult<Self> {
        let session = backend.connect(&identity, options).await?;
        log::info!(
            "Gateway {} opened for {} ({})",
            session,
            identity.certificate().subject,
            identity.msp_id
        );
        Ok(Self {
            backend,
            identity,
            session: Some(session),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn session(&self) -> GatewayResult<SessionId> {
        self.session.ok_or(GatewayError::NotConnected)
    }

    pub async fn get_network(&self, channel: &str) -> GatewayResult<Network<'_>> {
        let info = self.backend.discover(self.session()?, channel).await?;
        log::debug!("Discovered channel {} with peers {:?}", info.name, info.peers);
        Ok(Network {
            gateway: self,
            info,
        })
    }

    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            self.backend.disconnect(session);
            log::info!("Gateway {} disconnected", session);
        }
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.disconnect();
    }
}

pub struct Network<'g> {
    gateway: &'g Gateway,
    info: ChannelInfo,
}

impl<'g> Network<'g> {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &ChannelInfo {
        &self.info
    }

    pub fn get_contract(&self, chaincode: &str) -> Contract<'g> {
        Contract {
            gateway: self.gateway,
            channel: self.info.name.clone(),
            chaincode: chaincode.to_string(),
        }
    }
}

pub struct Contract<'g> {
    gateway: &'g Gateway,
    channel: String,
    chaincode: String,
}

impl Contract<'_> {
    pub fn chaincode(&self) -> &str {
        &self.chaincode
    }

    fn propose(&self, call: &TransactionCall) -> GatewayResult<SignedProposal> {
        Ok(SignedProposal::new(
            &self.gateway.identity,
            &self.channel,
            &self.chaincode,
            call,
        )?)
    }

    pub async fn submit(&self, call: &TransactionCall) -> GatewayResult<TransactionReceipt> {
        let session = self.gateway.session()?;
        let proposal = self.propose(call)?;
        self.gateway
            .backend
            .submit_transaction(session, &proposal)
            .await
    }

    pub async fn submit_transaction(
        &self,
        function: &str,
        args: &[&str],
    ) -> GatewayResult<Vec<u8>> {
        Ok(self
            .submit(&TransactionCall::new(function, args))
            .await?
            .payload)
    }

    pub async fn evaluate_transaction(
        &self,
        function: &str,
        args: &[&str],
    ) -> GatewayResult<Vec<u8>> {
        let session = self.gateway.session()?;
        let proposal = self.propose(&TransactionCall::new(function, args))?;
        self.gateway
            .backend
            .evaluate_transaction(session, &proposal)
            .await
    }
}
