use super::money::Amount;
use super::payment::PaymentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Charge,
    Refund,
    Capture,
}

/// Audit record of one gateway interaction. Written once, never updated.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub payment_reference: String,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub status: PaymentStatus,
    pub gateway_transaction_id: Option<String>,
    pub gateway_response: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn charge(
        payment_reference: &str,
        amount: Amount,
        gateway_transaction_id: Option<String>,
        gateway_response: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            payment_reference: payment_reference.to_string(),
            kind: TransactionKind::Charge,
            amount,
            status: PaymentStatus::Completed,
            gateway_transaction_id,
            gateway_response,
            error_message: None,
            created_at: now,
        }
    }

    pub fn refund(
        payment_reference: &str,
        amount: Amount,
        gateway_transaction_id: Option<String>,
        gateway_response: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: TransactionKind::Refund,
            status: PaymentStatus::Refunded,
            ..Self::charge(
                payment_reference,
                amount,
                gateway_transaction_id,
                gateway_response,
                now,
            )
        }
    }
}
