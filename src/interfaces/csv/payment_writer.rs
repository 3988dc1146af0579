use crate::domain::payment::Payment;
use crate::error::{PaymentError, Result};
use serde::Serialize;
use std::io::Write;

/// Flat view of a payment for spreadsheets and reconciliation.
#[derive(Debug, Serialize)]
struct PaymentRow<'a> {
    reference: &'a str,
    order_id: u64,
    payer_id: u64,
    amount: String,
    currency: &'a str,
    status: String,
    method: &'a str,
    gateway_transaction_id: &'a str,
    created_at: String,
    paid_at: String,
}

impl<'a> From<&'a Payment> for PaymentRow<'a> {
    fn from(p: &'a Payment) -> Self {
        Self {
            reference: &p.reference,
            order_id: p.order_id,
            payer_id: p.payer_id,
            amount: format!("{:.2}", p.amount.value()),
            currency: p.currency.as_str(),
            status: format!("{:?}", p.status).to_uppercase(),
            method: p.method.as_str(),
            gateway_transaction_id: p.gateway_transaction_id.as_deref().unwrap_or_default(),
            created_at: p.created_at.to_rfc3339(),
            paid_at: p.paid_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        }
    }
}

const HEADER: [&str; 10] = [
    "reference",
    "order_id",
    "payer_id",
    "amount",
    "currency",
    "status",
    "method",
    "gateway_transaction_id",
    "created_at",
    "paid_at",
];

/// Writes payments as CSV. The header row is written even when there are
/// no payments.
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().has_headers(false).from_writer(sink),
        }
    }

    pub fn write_payments<'a>(&mut self, payments: impl IntoIterator<Item = &'a Payment>) -> Result<()> {
        self.writer.write_record(HEADER)?;
        for payment in payments {
            self.writer.serialize(PaymentRow::from(payment))?;
        }
        self.writer.flush().map_err(PaymentError::from)
    }
}
