//! # Seed Data Generator
//!
//! Populates the database with the chart of accounts and demo branch
//! stock for development.
//!
//! ## Usage
//! ```bash
//! # Seed with defaults
//! cargo run -p gearbox-db --bin seed
//!
//! # Specify database path
//! cargo run -p gearbox-db --bin seed -- --db ./data/gearbox.db
//! ```
//!
//! ## What Gets Seeded
//! - The chart of accounts (Cash, Receivables, Sales Revenue, ...)
//! - Demo stock at two branches so transfers can be exercised

use chrono::Utc;
use std::env;
use uuid::Uuid;

use gearbox_core::{Account, AccountCategory, StockItem};
use gearbox_db::{Database, DbConfig};

/// The chart of accounts every deployment starts with.
///
/// `4000-SALES` is the posting target of the invoice paid transition and
/// must exist before any invoice can settle.
const ACCOUNTS: &[(&str, &str, AccountCategory)] = &[
    ("1000-CASH", "Cash", AccountCategory::Asset),
    ("1100-AR", "Accounts Receivable", AccountCategory::Asset),
    ("2000-AP", "Accounts Payable", AccountCategory::Liability),
    ("3000-EQUITY", "Owner Equity", AccountCategory::Equity),
    ("4000-SALES", "Sales Revenue", AccountCategory::Revenue),
    ("5000-PARTS", "Parts Expense", AccountCategory::Expense),
    ("5100-LABOUR", "Labour Expense", AccountCategory::Expense),
];

/// Demo stock: (branch, part_number, name, category, unit_cost, quantity)
const STOCK: &[(&str, &str, &str, &str, i64, i64)] = &[
    ("branch-main", "OIL-5W30", "Engine Oil 5W30", "lubricants", 4_500, 120),
    ("branch-main", "FLT-OIL", "Oil Filter", "filters", 1_200, 80),
    ("branch-main", "FLT-AIR", "Air Filter", "filters", 1_800, 60),
    ("branch-main", "BRK-PAD-F", "Front Brake Pads", "brakes", 9_500, 40),
    ("branch-main", "BRK-PAD-R", "Rear Brake Pads", "brakes", 8_500, 40),
    ("branch-main", "SPK-PLUG", "Spark Plug", "ignition", 950, 200),
    ("branch-north", "OIL-5W30", "Engine Oil 5W30", "lubricants", 4_500, 30),
    ("branch-north", "FLT-OIL", "Oil Filter", "filters", 1_200, 25),
    ("branch-north", "WIPER-STD", "Wiper Blade Standard", "exterior", 1_500, 50),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./gearbox_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Gearbox ERP Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./gearbox_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Gearbox ERP Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Idempotent: skip accounts that already exist so re-running is safe.
    println!();
    println!("Seeding chart of accounts...");

    let now = Utc::now();
    let mut created = 0;

    for (code, name, category) in ACCOUNTS {
        if db.ledger().get_account_by_code(code).await?.is_some() {
            println!("  {} already exists, skipping", code);
            continue;
        }

        let account = Account {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: name.to_string(),
            category: *category,
            balance_cents: 0,
            created_at: now,
            updated_at: now,
        };
        db.ledger().insert_account(&account).await?;
        created += 1;
    }

    println!("✓ {} accounts created", created);

    println!();
    println!("Seeding branch stock...");

    let mut stocked = 0;
    for (branch, part, name, category, cost, quantity) in STOCK {
        if db.transfers().get_stock(branch, part).await?.is_some() {
            continue;
        }

        let item = StockItem {
            id: Uuid::new_v4().to_string(),
            branch_id: branch.to_string(),
            part_number: part.to_string(),
            name: name.to_string(),
            category: Some(category.to_string()),
            unit_cost_cents: *cost,
            quantity: *quantity,
            created_at: now,
            updated_at: now,
        };
        db.transfers().insert_stock_item(&item).await?;
        stocked += 1;
    }

    println!("✓ {} stock records created", stocked);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
