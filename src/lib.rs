//! Payment settlement service: takes a payment from creation through a
//! third-party gateway to a final state, keeps an audit trail, and reports
//! the outcome to the order service. Refunds, invoices and wallets hang off
//! the same ledger.

pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod telemetry;
