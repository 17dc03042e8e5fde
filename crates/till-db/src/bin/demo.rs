//! # Register Demo
//!
//! Runs one full cashier shift against a scratch database: open the
//! drawer, post a handful of transactions, count and close, reconcile.
//!
//! ## Usage
//! ```bash
//! # Run against ./till_dev.db (default)
//! cargo run -p till-db --bin demo
//!
//! # Specify database path
//! cargo run -p till-db --bin demo -- --db ./data/till.db
//!
//! # With engine logging
//! RUST_LOG=till_db=debug cargo run -p till-db --bin demo
//! ```

use std::env;

use till_core::{Money, PaymentMethod, TransactionType};
use till_db::{Database, DbConfig, NewTransaction};
use tracing_subscriber::EnvFilter;

const TENANT_ID: i64 = 1;
const MANAGER_ID: i64 = 100;
const CASHIER_ID: i64 = 101;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./till_dev.db");

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
                println!("Till Register Demo");
                println!();
                println!("Usage: demo [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Till Register Demo");
    println!("==================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");
    println!();

    // Refuse to run twice against the same file: the cashier would still
    // have an open drawer from the previous run.
    if let Some(open) = db
        .lifecycle()
        .get_current_session(TENANT_ID, CASHIER_ID)
        .await?
    {
        println!("⚠ Cashier {} already has open session #{}", CASHIER_ID, open.session_number);
        println!("  Delete the database file to rerun the demo.");
        return Ok(());
    }

    // --- Open the drawer with a $100.00 float ------------------------------
    let session = db
        .lifecycle()
        .open_session(
            TENANT_ID,
            MANAGER_ID,
            CASHIER_ID,
            Money::from_cents(10_000),
            Some("Morning shift".to_string()),
        )
        .await?;
    println!(
        "✓ Opened session #{} with float {}",
        session.session_number,
        session.initial_balance()
    );

    // --- Ring up the shift -------------------------------------------------
    let postings = [
        (TransactionType::Sale, 4_250, Some(PaymentMethod::Cash), "Table 4", None),
        (TransactionType::Sale, 1_875, Some(PaymentMethod::Card), "Table 7", None),
        (TransactionType::Tip, 500, Some(PaymentMethod::Cash), "Tip jar", None),
        (
            TransactionType::Expense,
            1_200,
            None,
            "Window cleaner",
            Some("Supplies"),
        ),
    ];

    for (transaction_type, cents, payment_method, description, category) in postings {
        let posted = db
            .ledger()
            .post_transaction(
                TENANT_ID,
                NewTransaction {
                    session_id: session.id.clone(),
                    transaction_type,
                    amount: Money::from_cents(cents),
                    payment_method,
                    description: description.to_string(),
                    created_by: CASHIER_ID,
                    category: category.map(String::from),
                    order_id: None,
                },
            )
            .await?;
        println!(
            "  {:?} {} - {}",
            posted.transaction_type,
            posted.amount(),
            posted.description
        );
    }

    let expected = db
        .lifecycle()
        .get_session(TENANT_ID, &session.id)
        .await?
        .expected_balance();
    println!("✓ Expected drawer balance: {}", expected);

    // --- Count and close: the till is $3.00 short --------------------------
    let counted = expected - Money::from_cents(300);
    let closed = db
        .lifecycle()
        .close_session(TENANT_ID, &session.id, counted, None)
        .await?;
    println!("✓ Closed session #{} counting {}", closed.session_number, counted);
    println!();

    // --- Reconcile ---------------------------------------------------------
    let diff = db
        .reconciliation()
        .generate_cash_difference_report(TENANT_ID, &session.id)
        .await?;
    println!("Reconciliation");
    println!("  Expected:    {}", diff.expected());
    println!("  Counted:     {}", Money::from_cents(diff.actual_cents));
    println!("  Difference:  {}", Money::from_cents(diff.difference_cents));
    println!(
        "  Verdict:     {}",
        if diff.is_shortage() {
            "SHORTAGE"
        } else if diff.is_reconciled() {
            "reconciled"
        } else {
            "overage"
        }
    );

    let breakdown = db
        .reconciliation()
        .generate_payment_breakdown(TENANT_ID, &session.id)
        .await?;
    println!();
    println!("Payment breakdown");
    for (method, total) in &breakdown {
        println!("  {:?}: {}", method, total);
    }

    let summaries = db
        .report_aggregator()
        .get_daily_summary_reports(TENANT_ID, Some(CASHIER_ID), None, None)
        .await?;
    println!();
    println!("Daily summaries");
    for summary in &summaries {
        println!(
            "  {} session #{}: {} sales across {} transactions",
            summary.date,
            summary.session_number,
            summary.total_sales(),
            summary.total_transactions
        );
    }

    println!();
    println!("✓ Demo complete!");

    Ok(())
}
