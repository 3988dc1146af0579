use super::money::Currency;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: String,
}

/// Everything needed to issue an invoice, before totals are computed.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub payment_reference: String,
    pub order_id: u64,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub billing: BillingDetails,
    pub items: Vec<serde_json::Value>,
}

/// Billing snapshot for exactly one payment, frozen at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub number: String,
    pub payment_reference: String,
    pub order_id: u64,
    pub payer_id: u64,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub currency: Currency,
    pub billing: BillingDetails,
    pub items: Vec<serde_json::Value>,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InvoiceDraft {
    pub fn validate(&self) -> Result<(), PaymentError> {
        for (field, value) in [
            ("subtotal", self.subtotal),
            ("tax", self.tax),
            ("discount", self.discount),
        ] {
            if value < Decimal::ZERO {
                return Err(PaymentError::ValidationError(format!(
                    "{field} must not be negative"
                )));
            }
        }
        if self.total()? < Decimal::ZERO {
            return Err(PaymentError::ValidationError(
                "discount exceeds subtotal plus tax".to_string(),
            ));
        }
        if self.billing.name.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "billing name is required".to_string(),
            ));
        }
        if !is_plausible_email(&self.billing.email) {
            return Err(PaymentError::ValidationError(format!(
                "invalid billing email: {}",
                self.billing.email
            )));
        }
        Ok(())
    }

    /// subtotal + tax - discount; overflow is a validation failure.
    pub fn total(&self) -> Result<Decimal, PaymentError> {
        self.subtotal
            .checked_add(self.tax)
            .and_then(|gross| gross.checked_sub(self.discount))
            .ok_or_else(|| PaymentError::ValidationError("invoice total is out of range".to_string()))
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}
