//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller (HTTP handler, seed binary)                                    │
//! │       │                                                                 │
//! │       │  db.invoices().create_from_draft(&draft)                       │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── pricing/totals decided in tally-core (pure)                       │
//! │  └── SQL isolated here, one transaction per operation                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`PriceCategoryRepository`](price::PriceCategoryRepository) - Categories and daily prices
//! - [`ProductRepository`](product::ProductRepository) - Product catalog
//! - [`ClientRepository`](client::ClientRepository) - Clients and payment terms
//! - [`PricingRuleRepository`](pricing_rule::PricingRuleRepository) - Client pricing rules
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoices, items, status, reports
//! - [`PaymentRepository`](payment::PaymentRepository) - Payments and allocations
//! - [`NotificationRepository`](notification::NotificationRepository) - Event notices

pub mod client;
pub mod invoice;
pub mod notification;
pub mod payment;
pub mod price;
pub mod pricing_rule;
pub mod product;

#[cfg(test)]
pub(crate) mod test_support;
