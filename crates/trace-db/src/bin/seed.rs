//! # Seed Data Generator
//!
//! Populates a transaction log with demo products for development.
//!
//! ## Usage
//! ```bash
//! # 50 products (default)
//! cargo run -p trace-db --bin seed
//!
//! # Custom amount and database path
//! cargo run -p trace-db --bin seed -- --count 200 --db ./data/ledger.db
//! ```
//!
//! ## Generated Data
//! Every product goes through the contract, so the log holds real
//! transactions:
//! - `Create` by the manufacturer's operator
//! - `Package` with a few codes; every second product completes packaging
//!   and gets a revenue record

use chrono::Utc;
use serde_json::json;
use std::env;
use trace_core::{Contract, Invocation, MemoryLedger};
use trace_db::{Database, DbConfig, TransactionRepository};
use uuid::Uuid;

/// `(manufacturer, operator identity, product names)`
const CATALOG: &[(&str, &str, &[&str])] = &[
    (
        "VINATEA",
        "x509::CN=tea-ops,OU=client::CN=ca,O=Vinatea",
        &["Trà Xanh Thái Nguyên", "Trà Ô Long", "Green Tea Premium", "Jasmine Tea"],
    ),
    (
        "MEKONG-RICE",
        "x509::CN=rice-ops,OU=client::CN=ca,O=Mekong",
        &["Gạo ST25", "Gạo Tám Thơm", "Jasmine Rice", "Brown Rice"],
    ),
    (
        "HIGHLAND",
        "x509::CN=coffee-ops,OU=client::CN=ca,O=Highland",
        &["Cà Phê Robusta", "Cà Phê Arabica", "Espresso Blend", "Cold Brew Pack"],
    ),
];

const CODES_PER_PRODUCT: usize = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path = String::from("./trace_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Trace Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to create (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./trace_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Trace Ledger Seed Data Generator");
    println!("===================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let log = db.transactions();
    println!("✓ Connected to database");

    let existing = log.count().await?;
    if existing > 0 {
        println!("⚠ Log already has {} transactions", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut contract = Contract::new(MemoryLedger::new());
    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: loop {
        for (manufacturer, operator, names) in CATALOG {
            for name in names.iter() {
                if generated >= count {
                    break 'outer;
                }
                let id = format!("P{:04}", generated);
                let complete = generated % 2 == 0;
                seed_product(&mut contract, &log, manufacturer, operator, name, &id, complete)
                    .await?;
                generated += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Created {} products in {:?}", generated, elapsed);
    println!("  Transactions: {}", log.count().await?);
    println!("  Checksum:     {}", log.checksum().await?);
    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

async fn seed_product(
    contract: &mut Contract<MemoryLedger>,
    log: &TransactionRepository,
    manufacturer: &str,
    operator: &str,
    name: &str,
    id: &str,
    complete: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now().to_rfc3339();
    let request = json!({
        "ID": id,
        "Manufacturer": manufacturer,
        "ProductName": name,
        "Timestamp": now,
        "Location": "Factory",
        "Status": "CREATED",
        "LatestFormID": format!("FORM-{id}"),
        "OffchainHash": Uuid::new_v4().simple().to_string(),
        "Quantity": 0,
        "QuantityUnit": "box",
    });
    persist(contract, log, operator, Invocation::with_json("Create", &request)?).await?;

    let codes: Vec<String> = (0..CODES_PER_PRODUCT)
        .map(|_| format!("PKG-{}", Uuid::new_v4().simple()))
        .collect();
    let mut packing = request;
    packing["PackageCodeList"] = json!(codes);
    packing["PackagingComplete"] = json!(complete);
    packing["Status"] = json!("PACKAGED");
    packing["ExpiryDate"] = json!("2030-12-31");
    persist(contract, log, operator, Invocation::with_json("Package", &packing)?).await
}

/// Simulate, log, then commit.
async fn persist(
    contract: &mut Contract<MemoryLedger>,
    log: &TransactionRepository,
    operator: &str,
    invocation: Invocation,
) -> Result<(), Box<dyn std::error::Error>> {
    let proposal = contract.simulate(operator, &invocation)?;
    if let Some(tx) = &proposal.transaction {
        log.append(tx).await?;
        contract.commit(tx)?;
    }
    Ok(())
}
