use anyhow::{Context, Result};
use asset_transfer_client::config::AppConfig;
use asset_transfer_client::driver::{Application, DEMO_TRANSFERS, RunSummary, exit_status};
use asset_transfer_client::network::HyperledgerFabricGateway;
use asset_transfer_client::pki::{CaClient, InMemoryCa};
use asset_transfer_client::profile;
use asset_transfer_client::wallet::FileSystemWallet;
use std::process::ExitCode;
use std::sync::Arc;

async fn run() -> Result<RunSummary> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    log::info!(
        "Using channel {} and chaincode {}",
        config.channel_name,
        config.chaincode_name
    );

    let profile = profile::build_profile(&config)?;
    let ca = Arc::new(InMemoryCa::from_profile(profile.ca(&config.ca_host_name)?).await);
    let wallet = Arc::new(
        FileSystemWallet::open(&config.wallet_path)
            .await
            .context("failed to open wallet")?,
    );
    println!("  → Wallet path: {}", wallet.root().display());

    let ledger = Arc::new(HyperledgerFabricGateway::from_profile(
        &profile,
        &config,
        ca.root_key(),
    )?);

    Application::new(config, ca, wallet, ledger)
        .run(DEMO_TRANSFERS)
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let result = run().await;
    match &result {
        Ok(summary) => println!(
            "\n✓ Done: InitLedger and {} transfers committed",
            summary.transfers.len()
        ),
        Err(e) => log::error!("******** FAILED to run the application: {:#}", e),
    }
    ExitCode::from(exit_status(&result))
}
