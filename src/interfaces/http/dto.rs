//! Request and response bodies of the HTTP API.

use crate::application::orchestrator::{InitiatedPayment, RefundAction};
use crate::domain::invoice::{BillingDetails, InvoiceDraft};
use crate::domain::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::domain::wallet::{EntryKind, Wallet};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentBody {
    pub order_id: u64,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub callback_url: String,
    pub metadata: Option<Value>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitiatePaymentResponse {
    pub payment_id: String,
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

impl From<InitiatedPayment> for InitiatePaymentResponse {
    fn from(init: InitiatedPayment) -> Self {
        Self {
            payment_id: init.payment.reference.clone(),
            authorization_url: init.authorization.authorization_url,
            access_code: init.authorization.access_code,
            reference: init.payment.reference,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub paid_at: Option<DateTime<Utc>>,
    pub gateway_response: Option<Value>,
}

impl From<Payment> for VerifyPaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            payment_id: p.reference,
            status: p.status,
            amount: p.amount.value(),
            paid_at: p.paid_at,
            gateway_response: p.gateway_response,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentBody {
    pub order_id: u64,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRefundBody {
    pub payment_id: String,
    pub amount: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessRefundBody {
    pub action: RefundAction,
}

fn default_country() -> String {
    "Nigeria".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceBody {
    pub payment_id: String,
    pub order_id: u64,
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    pub billing_name: String,
    pub billing_email: String,
    pub billing_address: Option<String>,
    pub billing_city: Option<String>,
    pub billing_state: Option<String>,
    #[serde(default = "default_country")]
    pub billing_country: String,
    #[serde(default)]
    pub items: Vec<Value>,
}

impl From<CreateInvoiceBody> for InvoiceDraft {
    fn from(body: CreateInvoiceBody) -> Self {
        Self {
            payment_reference: body.payment_id,
            order_id: body.order_id,
            subtotal: body.subtotal,
            tax: body.tax,
            discount: body.discount,
            billing: BillingDetails {
                name: body.billing_name,
                email: body.billing_email,
                address: body.billing_address,
                city: body.billing_city,
                state: body.billing_state,
                country: body.billing_country,
            },
            items: body.items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WalletEntryBody {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub amount: Decimal,
    pub description: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WalletEntryResponse {
    pub wallet: Wallet,
    pub transaction: crate::domain::wallet::WalletTransaction,
}
