//! Fixtures shared by repository tests.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tally_core::{
    Client, DraftLineItem, Invoice, InvoiceDraft, InvoiceStatus, Money, Percent, Product,
};
use uuid::Uuid;

use crate::pool::{Database, DbConfig};

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub(crate) fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// A client on 30 day terms.
pub(crate) async fn seed_client(db: &Database, name: &str, value_per_bird: Decimal) -> Client {
    let now = Utc::now();
    let client = Client {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: None,
        phone: None,
        address: None,
        due_days: 30,
        value_per_bird: Money::new(value_per_bird),
        created_at: now,
        updated_at: now,
    };
    db.clients().insert(&client).await.unwrap()
}

/// An untaxed product at position 0.
pub(crate) async fn seed_product(
    db: &Database,
    name: &str,
    unit_price: Decimal,
    paper_price: Decimal,
) -> Product {
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: None,
        unit_price: Money::new(unit_price),
        paper_price: Money::new(paper_price),
        tax_rate: Percent::zero(),
        is_active: true,
        position: 0,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap()
}

/// A draft invoice with one untaxed custom line worth `total`.
pub(crate) async fn seed_invoice(
    db: &Database,
    client: &Client,
    issue_date: NaiveDate,
    total: Decimal,
) -> Invoice {
    let draft = InvoiceDraft::new(client, issue_date)
        .add_line(DraftLineItem::custom(
            "Live birds",
            Decimal::ONE,
            Money::new(total),
            Percent::zero(),
        ))
        .unwrap();
    db.invoices().create_from_draft(&draft).await.unwrap()
}

/// A sent invoice for a fresh client.
pub(crate) async fn seed_sent_invoice(db: &Database, issue_date: NaiveDate, total: Decimal) -> Invoice {
    let client = seed_client(db, "Ahmed Poultry", Decimal::ZERO).await;
    let invoice = seed_invoice(db, &client, issue_date, total).await;
    db.invoices()
        .set_status(&invoice.id, InvoiceStatus::Sent)
        .await
        .unwrap()
}
