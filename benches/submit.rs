use asset_transfer_client::blockchain::TransactionCall;
use asset_transfer_client::chaincode::AssetTransfer;
use asset_transfer_client::crypto::HardwareSecurityModule;
use asset_transfer_client::network::{ConnectOptions, Gateway, HyperledgerFabricGateway};
use asset_transfer_client::pki::{CaClient, InMemoryCa, enroll_admin};
use asset_transfer_client::wallet::{InMemoryWallet, WalletStore};
use criterion::{Criterion, criterion_group, criterion_main};
use std::sync::Arc;

fn bench_submit(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let gateway = runtime.block_on(async {
        let ca = InMemoryCa::new(
            "ca-org1",
            "https://localhost:7054",
            Arc::new(HardwareSecurityModule::new()),
        )
        .await;
        let wallet = InMemoryWallet::new();
        enroll_admin(&ca, &wallet, "Org1MSP").await.unwrap();
        let identity = wallet.get("admin").await.unwrap().unwrap();

        let fabric = Arc::new(
            HyperledgerFabricGateway::new()
                .trust("Org1MSP", ca.root_key())
                .channel("mychannel", vec!["Org1MSP".to_string()])
                .deploy("mychannel", "basic", Arc::new(AssetTransfer)),
        );
        Gateway::connect(fabric, identity, &ConnectOptions::default())
            .await
            .unwrap()
    });

    let contract = runtime
        .block_on(gateway.get_network("mychannel"))
        .unwrap()
        .get_contract("basic");
    runtime
        .block_on(contract.submit(&TransactionCall::init_ledger()))
        .unwrap();

    let transfer = TransactionCall::new(
        "Transfer",
        &[
            "1c5e4a0c2b3f9d8e7a6b5c4d3e2f1a0b9c8d7e6f",
            "7cafb40b30e8f7f0c8f57393e2ea63ff58a95907",
            "1",
        ],
    );
    c.bench_function("submit_transfer", |b| {
        b.iter(|| runtime.block_on(contract.submit(&transfer)).unwrap())
    });
    c.bench_function("evaluate_balance", |b| {
        b.iter(|| {
            runtime
                .block_on(contract.evaluate_transaction(
                    "BalanceOf",
                    &["7cafb40b30e8f7f0c8f57393e2ea63ff58a95907"],
                ))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_submit);
criterion_main!(benches);
