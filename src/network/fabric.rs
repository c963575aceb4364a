use super::gateway::{
    ChannelInfo, ConnectOptions, GatewayError, GatewayResult, LedgerGateway, SessionId,
    TransactionReceipt,
};
use crate::blockchain::{BlockLedger, CommittedTransaction, SignedProposal, TransactionCall};
use crate::chaincode::{AssetTransfer, Chaincode, ChaincodeStub, WorldState};
use crate::config::AppConfig;
use crate::pki::Certificate;
use crate::profile::{ConnectionProfile, ProfileError};
use crate::wallet::Identity;
use async_trait::async_trait;
use ed25519_dalek::VerifyingKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::RwLock;

struct Channel {
    members: Vec<String>,
    chaincodes: HashMap<String, Arc<dyn Chaincode>>,
    state: RwLock<WorldState>,
    ledger: BlockLedger,
}

struct Session {
    msp_id: String,
    subject: String,
}

/// An in-process stand-in for a channel's peers and orderer. It checks
/// identities and signatures, runs the deployed contract to endorse, and
/// commits one transaction per block.
pub struct HyperledgerFabricGateway {
    trusted_roots: HashMap<String, VerifyingKey>,
    channels: HashMap<String, Channel>,
    peers: Vec<String>,
    sessions: Mutex<HashMap<SessionId, Session>>,
    next_session: AtomicU64,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    submissions: Mutex<Vec<TransactionCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl HyperledgerFabricGateway {
    pub fn new() -> Self {
        Self {
            trusted_roots: HashMap::new(),
            channels: HashMap::new(),
            peers: Vec::new(),
            sessions: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// The channel and contract named by the config, with every organization
    /// of the profile as a member and `ca_root` as the config's MSP root.
    pub fn from_profile(
        profile: &ConnectionProfile,
        config: &AppConfig,
        ca_root: VerifyingKey,
    ) -> Result<Self, ProfileError> {
        profile.organization_for_msp(&config.msp_id)?;

        let mut gateway = Self::new()
            .trust(&config.msp_id, ca_root)
            .channel(&config.channel_name, profile.msp_ids())
            .deploy(&config.channel_name, &config.chaincode_name, Arc::new(AssetTransfer));
        gateway.peers = profile.peers.values().map(|p| p.url.clone()).collect();
        Ok(gateway)
    }

    pub fn trust(mut self, msp_id: &str, root: VerifyingKey) -> Self {
        self.trusted_roots.insert(msp_id.to_string(), root);
        self
    }

    pub fn channel(mut self, name: &str, members: Vec<String>) -> Self {
        self.channels.insert(
            name.to_string(),
            Channel {
                members,
                chaincodes: HashMap::new(),
                state: RwLock::new(WorldState::new()),
                ledger: BlockLedger::new(),
            },
        );
        self
    }

    /// Deploys onto a channel previously added with [`Self::channel`];
    /// unknown channels are ignored.
    pub fn deploy(mut self, channel: &str, name: &str, chaincode: Arc<dyn Chaincode>) -> Self {
        if let Some(ch) = self.channels.get_mut(channel) {
            ch.chaincodes.insert(name.to_string(), chaincode);
        } else {
            log::warn!("cannot deploy {}: channel {} does not exist", name, channel);
        }
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::Relaxed)
    }

    pub fn open_sessions(&self) -> usize {
        lock(&self.sessions).len()
    }

    /// Every call a client tried to submit, in arrival order, committed or not.
    pub fn submitted_calls(&self) -> Vec<TransactionCall> {
        lock(&self.submissions).clone()
    }

    pub async fn committed_calls(&self, channel: &str) -> Vec<TransactionCall> {
        match self.channels.get(channel) {
            Some(ch) => ch.ledger.committed_calls().await,
            None => Vec::new(),
        }
    }

    pub async fn ledger_height(&self, channel: &str) -> u64 {
        match self.channels.get(channel) {
            Some(ch) => ch.ledger.height().await,
            None => 0,
        }
    }

    pub async fn ledger_is_consistent(&self, channel: &str) -> bool {
        match self.channels.get(channel) {
            Some(ch) => ch.ledger.verify_chain().await,
            None => false,
        }
    }

    fn check_identity(&self, msp_id: &str, identity: &Certificate) -> GatewayResult<()> {
        let Some(root) = self.trusted_roots.get(msp_id) else {
            return Err(GatewayError::AccessDenied(format!("unknown MSP {}", msp_id)));
        };
        if identity.verify(root).is_err() {
            return Err(GatewayError::AccessDenied(format!(
                "certificate of {} is not issued by {}",
                identity.subject, msp_id
            )));
        }
        if !identity.is_valid() {
            return Err(GatewayError::AccessDenied(format!(
                "certificate of {} is expired",
                identity.subject
            )));
        }
        Ok(())
    }

    fn session_msp(&self, session: SessionId) -> GatewayResult<String> {
        lock(&self.sessions)
            .get(&session)
            .map(|s| s.msp_id.clone())
            .ok_or(GatewayError::NotConnected)
    }

    fn member_channel(&self, msp_id: &str, channel: &str) -> GatewayResult<&Channel> {
        let ch = self
            .channels
            .get(channel)
            .ok_or_else(|| GatewayError::ChannelNotFound(channel.to_string()))?;
        if !ch.members.iter().any(|m| m == msp_id) {
            return Err(GatewayError::DiscoveryDenied {
                channel: channel.to_string(),
                msp_id: msp_id.to_string(),
            });
        }
        Ok(ch)
    }

    /// Everything up to and including chaincode selection.
    fn validate_proposal(
        &self,
        session: SessionId,
        signed: &SignedProposal,
    ) -> GatewayResult<(&Channel, Arc<dyn Chaincode>)> {
        let msp_id = self.session_msp(session)?;
        let proposal = &signed.proposal;
        if proposal.creator_msp != msp_id {
            return Err(GatewayError::AccessDenied(format!(
                "proposal creator {} does not match session MSP {}",
                proposal.creator_msp, msp_id
            )));
        }
        self.check_identity(&msp_id, &proposal.creator)?;
        signed
            .verify()
            .map_err(|e| {
                GatewayError::AccessDenied(format!("proposal {}: {}", proposal.tx_id, e))
            })?;

        let channel = self.member_channel(&msp_id, &proposal.channel)?;
        let chaincode = channel
            .chaincodes
            .get(&proposal.chaincode)
            .cloned()
            .ok_or_else(|| GatewayError::ChaincodeNotFound {
                channel: proposal.channel.clone(),
                chaincode: proposal.chaincode.clone(),
            })?;
        Ok((channel, chaincode))
    }

    fn endorse(
        chaincode: &dyn Chaincode,
        state: &WorldState,
        signed: &SignedProposal,
    ) -> GatewayResult<(Vec<u8>, Vec<(String, Vec<u8>)>)> {
        let proposal = &signed.proposal;
        let mut stub = ChaincodeStub::new(state, &proposal.tx_id);
        let payload = chaincode
            .invoke(&mut stub, &proposal.call.function, &proposal.call.args)
            .map_err(|source| GatewayError::Endorsement {
                tx_id: proposal.tx_id.clone(),
                source,
            })?;
        Ok((payload, stub.into_writes()))
    }
}

impl Default for HyperledgerFabricGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for HyperledgerFabricGateway {
    async fn connect(
        &self,
        identity: &Identity,
        options: &ConnectOptions,
    ) -> GatewayResult<SessionId> {
        self.check_identity(&identity.msp_id, identity.certificate())?;

        let session = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        lock(&self.sessions).insert(
            session,
            Session {
                msp_id: identity.msp_id.clone(),
                subject: identity.certificate().subject.clone(),
            },
        );
        self.connects.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "{} connected (discovery: {}, as localhost: {})",
            session,
            options.discovery.enabled,
            options.discovery.as_localhost
        );
        Ok(session)
    }

    async fn discover(&self, session: SessionId, channel: &str) -> GatewayResult<ChannelInfo> {
        let msp_id = self.session_msp(session)?;
        let ch = self.member_channel(&msp_id, channel)?;
        Ok(ChannelInfo {
            name: channel.to_string(),
            members: ch.members.clone(),
            peers: self.peers.clone(),
        })
    }

    async fn submit_transaction(
        &self,
        session: SessionId,
        proposal: &SignedProposal,
    ) -> GatewayResult<TransactionReceipt> {
        lock(&self.submissions).push(proposal.proposal.call.clone());
        let (channel, chaincode) = self.validate_proposal(session, proposal)?;

        let mut state = channel.state.write().await;
        let (payload, writes) = Self::endorse(chaincode.as_ref(), &state, proposal)?;

        let block_number = channel
            .ledger
            .append(vec![CommittedTransaction {
                proposal: proposal.clone(),
                writes: writes.clone(),
            }])
            .await;
        state.extend(writes);
        drop(state);

        log::debug!(
            "committed {} as {} in block {}",
            proposal.proposal.call.function,
            proposal.tx_id(),
            block_number
        );
        Ok(TransactionReceipt {
            tx_id: proposal.tx_id().to_string(),
            block_number,
            payload,
        })
    }

    async fn evaluate_transaction(
        &self,
        session: SessionId,
        proposal: &SignedProposal,
    ) -> GatewayResult<Vec<u8>> {
        let (channel, chaincode) = self.validate_proposal(session, proposal)?;
        let state = channel.state.read().await;
        let (payload, _) = Self::endorse(chaincode.as_ref(), &state, proposal)?;
        Ok(payload)
    }

    fn disconnect(&self, session: SessionId) {
        if let Some(closed) = lock(&self.sessions).remove(&session) {
            self.disconnects.fetch_add(1, Ordering::Relaxed);
            log::debug!("{} closed for {}", session, closed.subject);
        }
    }
}
