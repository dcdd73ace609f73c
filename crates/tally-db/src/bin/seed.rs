//! # Seed Data Generator
//!
//! Populates the database with demo billing data for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally.db (or TALLY_DB_PATH)
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally_dev.db
//! ```
//!
//! ## Generated Data
//! - Price categories with a month of daily prices
//! - Products with default and paper prices
//! - Clients with per-bird values and payment terms
//! - One pricing rule of each kind
//! - Two sent invoices and a bulk payment spread across them

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use tally_core::{
    Client, DisplayStatus, DraftLineItem, InvoiceDraft, InvoiceRate, InvoiceStatus, Money,
    PaymentMethod, PerBirdPricing, Percent, PriceRule, Product,
};
use tally_db::config::init_tracing;
use tally_db::{AppConfig, Database, PaymentInput};
use tracing::info;
use uuid::Uuid;

type SeedResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Price categories and the price around which their daily price moves.
const CATEGORIES: &[(&str, Decimal)] = &[
    ("Broiler Live", dec!(480)),
    ("Layer Live", dec!(300)),
    ("Eggs Tray", dec!(900)),
];

/// Products: (name, unit price, paper price, tax rate).
const PRODUCTS: &[(&str, Decimal, Decimal, Decimal)] = &[
    ("Broiler (kg)", dec!(500), dec!(470), dec!(0)),
    ("Layer (kg)", dec!(320), dec!(300), dec!(0)),
    ("Eggs (tray)", dec!(950), dec!(920), dec!(0)),
    ("Feed Bag 50kg", dec!(7800), dec!(7600), dec!(5)),
];

/// Days of price history to generate, ending today.
const HISTORY_DAYS: u64 = 30;

#[tokio::main]
async fn main() -> SeedResult<()> {
    init_tracing();

    let mut config = AppConfig::from_env()?;

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.db_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: TALLY_DB_PATH or ./tally.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database: {}", config.db_path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.clients().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} clients", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let today = Utc::now().date_naive();

    // -------------------------------------------------------------------------
    // Categories and price history
    // -------------------------------------------------------------------------

    let mut categories = Vec::new();
    for (name, base) in CATEGORIES {
        let category = db.price_categories().create(name, None).await?;
        for day in 0..HISTORY_DAYS {
            let date = days_ago(today, HISTORY_DAYS - 1 - day)?;
            db.price_categories()
                .upsert_price(&category.id, date, Money::new(daily_price(*base, day)))
                .await?;
        }
        categories.push(category);
    }
    println!(
        "✓ {} price categories with {} days of prices",
        categories.len(),
        HISTORY_DAYS
    );

    // -------------------------------------------------------------------------
    // Products and clients
    // -------------------------------------------------------------------------

    let mut products = Vec::new();
    for (position, (name, unit, paper, tax)) in PRODUCTS.iter().enumerate() {
        let product = db
            .products()
            .insert(&new_product(name, *unit, *paper, *tax, position as i64))
            .await?;
        products.push(product);
    }
    println!("✓ {} products", products.len());

    let ahmed = db
        .clients()
        .insert(&new_client("Ahmed Poultry Traders", 15, dec!(0.25)))
        .await?;
    let zafar = db
        .clients()
        .insert(&new_client("Zafar Farms", config.default_due_days, dec!(-0.10)))
        .await?;
    let city = db
        .clients()
        .insert(&new_client("City Meat Shop", 7, Decimal::ZERO))
        .await?;
    println!("✓ 3 clients");

    // -------------------------------------------------------------------------
    // Pricing rules, one of each kind
    // -------------------------------------------------------------------------

    let rules = db.pricing_rules();
    rules
        .upsert(
            &ahmed.id,
            &products[0].id,
            Some(&categories[0].id),
            PriceRule::DiscountFlat(Money::new(dec!(10))),
        )
        .await?;
    rules
        .upsert(
            &zafar.id,
            &products[1].id,
            None,
            PriceRule::DiscountPercentage(Percent::new(dec!(5))),
        )
        .await?;
    rules
        .upsert(
            &city.id,
            &products[2].id,
            Some(&categories[2].id),
            PriceRule::Multiplier(dec!(1.02)),
        )
        .await?;
    println!("✓ 3 pricing rules");

    // -------------------------------------------------------------------------
    // Invoices
    // -------------------------------------------------------------------------

    let inputs = db.pricing_inputs(&ahmed.id).await?;

    let older_issue = days_ago(today, 20)?;
    let ctx = inputs.context(older_issue);
    let older = InvoiceDraft::new(&inputs.client, older_issue)
        .add_line(DraftLineItem::for_product(
            &ctx,
            &products[0],
            dec!(120),
            PerBirdPricing::enabled(40),
        ))?
        .add_line(DraftLineItem::for_product(
            &ctx,
            &products[3],
            dec!(2),
            PerBirdPricing::disabled(),
        ))?
        .set_invoice_rate(InvoiceRate::Discount, Percent::new(dec!(2)))?
        .set_notes(Some("Seeded invoice".to_string()));

    let recent_issue = days_ago(today, 5)?;
    let ctx = inputs.context(recent_issue);
    let recent = InvoiceDraft::new(&inputs.client, recent_issue).add_line(
        DraftLineItem::for_product(&ctx, &products[0], dec!(80), PerBirdPricing::disabled()),
    )?;

    let mut invoices = Vec::new();
    for draft in [&older, &recent] {
        let invoice = db.invoices().create_from_draft(draft).await?;
        let invoice = db
            .invoices()
            .set_status(&invoice.id, InvoiceStatus::Sent)
            .await?;
        println!(
            "✓ Invoice {} for {}",
            invoice.invoice_number,
            config.format_currency(invoice.total_amount)
        );
        invoices.push(invoice);
    }

    // -------------------------------------------------------------------------
    // Bulk payment: settles the older invoice, part-pays the recent one
    // -------------------------------------------------------------------------

    let amount = invoices[0].total_amount + Money::new(dec!(5000));
    let payment = db
        .payments()
        .record_bulk(
            &ahmed.id,
            &PaymentInput::new(amount, PaymentMethod::BankTransfer, today)
                .with_reference("SEED-TRF-0001"),
        )
        .await?;

    println!("✓ Payment of {}", config.format_currency(payment.payment.amount));
    for app in &payment.allocation.applications {
        println!(
            "  {} ← {} ({})",
            app.invoice_number,
            config.format_currency(app.amount),
            app.status
        );
    }

    let reminders = db.notifications().remind_overdue(today).await?;
    let statement = db.invoices().statement(&ahmed.id, today).await?;
    let overdue = statement
        .lines
        .iter()
        .filter(|l| l.status == DisplayStatus::Overdue)
        .count();

    info!(
        invoices = statement.lines.len(),
        overdue,
        reminders = reminders.len(),
        "Seed complete"
    );

    println!();
    println!(
        "Outstanding for {}: {}",
        ahmed.name,
        config.format_currency(statement.total_outstanding)
    );
    println!("✓ Seed complete!");

    Ok(())
}

fn days_ago(today: NaiveDate, days: u64) -> SeedResult<NaiveDate> {
    today
        .checked_sub_days(Days::new(days))
        .ok_or_else(|| format!("{days} days before {today} is out of range").into())
}

/// Deterministic daily movement of ±5 around `base`.
fn daily_price(base: Decimal, day: u64) -> Decimal {
    let swing = ((day * 7) % 11) as i64 - 5;
    base + Decimal::from(swing)
}

fn new_product(name: &str, unit: Decimal, paper: Decimal, tax: Decimal, position: i64) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: None,
        unit_price: Money::new(unit),
        paper_price: Money::new(paper),
        tax_rate: Percent::new(tax),
        is_active: true,
        position,
        created_at: now,
        updated_at: now,
    }
}

fn new_client(name: &str, due_days: u32, value_per_bird: Decimal) -> Client {
    let now = Utc::now();
    Client {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: None,
        phone: None,
        address: None,
        due_days,
        value_per_bird: Money::new(value_per_bird),
        created_at: now,
        updated_at: now,
    }
}
