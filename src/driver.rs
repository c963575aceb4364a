//! The demo workflow: enroll, connect, then submit `InitLedger` and a fixed
//! list of transfers in order.

use crate::blockchain::{TransactionCall, Transfer};
use crate::config::AppConfig;
use crate::network::{ConnectOptions, Contract, Gateway, LedgerGateway, TransactionReceipt};
use crate::pki::{CaClient, EnrollOutcome, enroll_admin, register_and_enroll_user};
use crate::wallet::WalletStore;
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;

pub const DEMO_TRANSFERS: &[Transfer<'static>] = &[
    Transfer {
        from: "1c5e4a0c2b3f9d8e7a6b5c4d3e2f1a0b9c8d7e6f",
        to: "7cafb40b30e8f7f0c8f57393e2ea63ff58a95907",
        amount: "10000000",
    },
    Transfer {
        from: "7cafb40b30e8f7f0c8f57393e2ea63ff58a95907",
        to: "f5c705db130ec0cbda536bfacc8e38425b427862",
        amount: "7500000",
    },
    Transfer {
        from: "f5c705db130ec0cbda536bfacc8e38425b427862",
        to: "3b8e2d91f4a6c7e0d5b9a8c1e2f3d4a5b6c7d8e9",
        amount: "2500000",
    },
    Transfer {
        from: "9e0f4b7d2c1a8e3f5d6c7b8a9f0e1d2c3b4a5f6e",
        to: "7cafb40b30e8f7f0c8f57393e2ea63ff58a95907",
        amount: "12000000",
    },
    Transfer {
        from: "3b8e2d91f4a6c7e0d5b9a8c1e2f3d4a5b6c7d8e9",
        to: "1c5e4a0c2b3f9d8e7a6b5c4d3e2f1a0b9c8d7e6f",
        amount: "1250000",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub admin: EnrollOutcome,
    pub user: EnrollOutcome,
    pub init_ledger: TransactionReceipt,
    pub transfers: Vec<TransactionReceipt>,
}

pub struct Application {
    config: AppConfig,
    ca: Arc<dyn CaClient>,
    wallet: Arc<dyn WalletStore>,
    ledger: Arc<dyn LedgerGateway>,
}

impl Application {
    pub fn new(
        config: AppConfig,
        ca: Arc<dyn CaClient>,
        wallet: Arc<dyn WalletStore>,
        ledger: Arc<dyn LedgerGateway>,
    ) -> Self {
        Self {
            config,
            ca,
            wallet,
            ledger,
        }
    }

    /// Stops at the first failure. The gateway session, once opened, is
    /// closed exactly once on every path.
    pub async fn run(&self, transfers: &[Transfer<'_>]) -> Result<RunSummary> {
        let config = &self.config;

        println!("[1/3] Enrolling identities with {}...", self.ca.ca_name());
        let admin = enroll_admin(self.ca.as_ref(), self.wallet.as_ref(), &config.msp_id)
            .await
            .context("failed to enroll admin")?;
        let user = register_and_enroll_user(
            self.ca.as_ref(),
            self.wallet.as_ref(),
            &config.msp_id,
            &config.app_user_id,
            &config.app_user_affiliation,
        )
        .await
        .with_context(|| format!("failed to enroll user {}", config.app_user_id))?;

        let identity = self
            .wallet
            .get(&config.app_user_id)
            .await?
            .ok_or_else(|| anyhow!("identity {} missing from wallet", config.app_user_id))?;

        println!("[2/3] Connecting to channel {}...", config.channel_name);
        let options = ConnectOptions::default();
        let mut gateway = Gateway::connect(self.ledger.clone(), identity, &options)
            .await
            .context("failed to connect gateway")?;

        let submitted = self.submit_all(&gateway, transfers).await;
        gateway.disconnect();
        let (init_ledger, transfers) = submitted?;

        Ok(RunSummary {
            admin,
            user,
            init_ledger,
            transfers,
        })
    }

    async fn submit_all(
        &self,
        gateway: &Gateway,
        transfers: &[Transfer<'_>],
    ) -> Result<(TransactionReceipt, Vec<TransactionReceipt>)> {
        let network = gateway
            .get_network(&self.config.channel_name)
            .await
            .with_context(|| format!("failed to get network {}", self.config.channel_name))?;
        let contract = network.get_contract(&self.config.chaincode_name);

        println!(
            "[3/3] Submitting transactions to {} on {}...",
            contract.chaincode(),
            network.name()
        );
        let init_ledger = submit(&contract, &TransactionCall::init_ledger()).await?;

        let mut receipts = Vec::with_capacity(transfers.len());
        for transfer in transfers {
            receipts.push(submit(&contract, &transfer.to_call()).await?);
        }
        Ok((init_ledger, receipts))
    }
}

async fn submit(contract: &Contract<'_>, call: &TransactionCall) -> Result<TransactionReceipt> {
    let receipt = contract
        .submit(call)
        .await
        .with_context(|| format!("failed to submit {}", call))?;
    println!(
        "  ✓ Committed {} (tx {}, block {})",
        call, receipt.tx_id, receipt.block_number
    );
    Ok(receipt)
}

/// Process exit status for a finished run.
pub fn exit_status<T>(result: &Result<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}
