use super::money::Amount;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
    /// Claimed for payout; the gateway refund is in flight.
    Processing,
    Completed,
}

impl RefundStatus {
    pub fn transition(self, to: RefundStatus) -> Result<Self, PaymentError> {
        use RefundStatus::*;
        match (self, to) {
            (Pending, Approved) | (Pending, Rejected) | (Approved, Processing) | (Processing, Completed) => {
                Ok(to)
            }
            (from, to) => Err(PaymentError::InvalidRefundTransition { from, to }),
        }
    }

    /// Hands a claimed refund back to APPROVED after a failed payout.
    pub fn release(self) -> Result<Self, PaymentError> {
        match self {
            Self::Processing => Ok(Self::Approved),
            from => Err(PaymentError::InvalidRefundTransition {
                from,
                to: Self::Approved,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub reference: String,
    pub payment_reference: String,
    pub amount: Amount,
    pub reason: Option<String>,
    pub status: RefundStatus,
    pub gateway_refund_id: Option<String>,
    pub gateway_response: Option<serde_json::Value>,
    pub requested_by: u64,
    pub processed_by: Option<u64>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Refund {
    pub fn new(
        reference: String,
        payment_reference: &str,
        amount: Amount,
        reason: Option<String>,
        requested_by: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            reference,
            payment_reference: payment_reference.to_string(),
            amount,
            reason,
            status: RefundStatus::Pending,
            gateway_refund_id: None,
            gateway_response: None,
            requested_by,
            processed_by: None,
            requested_at: now,
            processed_at: None,
        }
    }

    /// Moves the refund to `to`, stamping who processed it and when.
    pub fn advance(&mut self, to: RefundStatus, processor: u64, now: DateTime<Utc>) -> Result<(), PaymentError> {
        self.status = self.status.transition(to)?;
        self.processed_by = Some(processor);
        self.processed_at = Some(now);
        Ok(())
    }

    /// Rejected refunds no longer reserve any of the payment's amount.
    pub fn reserves_funds(&self) -> bool {
        self.status != RefundStatus::Rejected
    }
}
