//! Log replay against a file database, reopened between runs.

use serde_json::json;
use trace_core::{Contract, Invocation, Ledger, MemoryLedger};
use trace_db::{Database, DbConfig, TransactionRepository};

const ALICE: &str = "x509::CN=alice,OU=client::CN=ca,O=Org";

async fn persist(
    contract: &mut Contract<MemoryLedger>,
    log: &TransactionRepository,
    invocation: Invocation,
) {
    let proposal = contract.simulate(ALICE, &invocation).unwrap();
    if let Some(tx) = &proposal.transaction {
        log.append(tx).await.unwrap();
        contract.commit(tx).unwrap();
    }
}

#[tokio::test]
async fn test_replay_reproduces_state_and_history() {
    let path = std::env::temp_dir().join(format!("trace-replay-{}.db", uuid::Uuid::new_v4()));

    let db = Database::new(DbConfig::new(&path)).await.unwrap();
    let log = db.transactions();
    let mut contract = Contract::new(MemoryLedger::new());

    let product = json!({"ID": "P1", "Manufacturer": "M1", "ProductName": "Green Tea"});
    persist(&mut contract, &log, Invocation::with_json("Create", &product).unwrap()).await;

    let mut packing = product.clone();
    packing["PackageCodeList"] = json!(["C1", "C2"]);
    packing["PackagingComplete"] = json!(true);
    persist(&mut contract, &log, Invocation::with_json("Package", &packing).unwrap()).await;

    let lines = json!([{"Manufacturer": "M1", "ID": "P1", "Quantity": 1}]).to_string();
    persist(
        &mut contract,
        &log,
        Invocation::new("Settle", [lines, "s-1".to_string()]),
    )
    .await;

    let checksum = log.checksum().await.unwrap();
    db.close().await;

    let reopened = Database::new(DbConfig::new(&path)).await.unwrap();
    let log = reopened.transactions();
    assert_eq!(log.count().await.unwrap(), 3);
    assert_eq!(log.checksum().await.unwrap(), checksum);

    let mut ledger = MemoryLedger::new();
    assert_eq!(log.replay_into(&mut ledger).await.unwrap(), 3);

    let original = contract.ledger();
    assert_eq!(ledger.height(), original.height());
    assert_eq!(ledger.entries(), original.entries());

    let key = trace_core::contract::keys::product_key("M1", "P1").unwrap();
    assert_eq!(ledger.history(&key).unwrap(), original.history(&key).unwrap());

    let replayed = Contract::new(ledger);
    let report = replayed
        .simulate(ALICE, &Invocation::new("VerifyHistory", [product.to_string()]))
        .unwrap();
    assert_eq!(report.response["Valid"], true);

    reopened.close().await;
    let _ = std::fs::remove_file(&path);
}
