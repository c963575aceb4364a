pub mod fabric;
pub mod gateway;

pub use fabric::HyperledgerFabricGateway;
pub use gateway::{
    ChannelInfo, ConnectOptions, Contract, DiscoveryOptions, Gateway, GatewayError, GatewayResult,
    LedgerGateway, Network, SessionId, TransactionReceipt,
};
