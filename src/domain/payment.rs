use super::gateway::GatewayProvider;
use super::money::{Amount, Currency};
use crate::error::PaymentError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

/// Something that happened to a payment. The status only ever moves in
/// response to one of these, through [`PaymentStatus::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEvent {
    VerificationStarted,
    GatewaySucceeded,
    GatewayFailed,
    RefundCompleted,
}

impl PaymentEvent {
    /// The event an administrator override to `target` stands for. There is
    /// none for `Pending` (never re-entered) or `Refunded` (refunds only).
    pub fn leading_to(target: PaymentStatus) -> Option<Self> {
        match target {
            PaymentStatus::Processing => Some(Self::VerificationStarted),
            PaymentStatus::Completed => Some(Self::GatewaySucceeded),
            PaymentStatus::Failed => Some(Self::GatewayFailed),
            PaymentStatus::Pending | PaymentStatus::Refunded => None,
        }
    }
}

impl PaymentStatus {
    pub fn transition(self, event: PaymentEvent) -> Result<Self, PaymentError> {
        use PaymentEvent::*;
        use PaymentStatus::*;

        match (self, event) {
            (Pending, VerificationStarted) => Ok(Processing),
            (Pending | Processing, GatewaySucceeded) => Ok(Completed),
            (Pending | Processing, GatewayFailed) => Ok(Failed),
            // Further partial refunds keep a refunded payment refunded.
            (Completed | Refunded, RefundCompleted) => Ok(Refunded),
            (from, event) => Err(PaymentError::InvalidStateTransition { from, event }),
        }
    }

    /// Completed, failed and refunded payments are settled; verification
    /// never touches them again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Refunded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    Paypal,
    Stripe,
    Paystack,
    Flutterwave,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
            Self::Paypal => "paypal",
            Self::Stripe => "stripe",
            Self::Paystack => "paystack",
            Self::Flutterwave => "flutterwave",
        }
    }

    /// Gateway that settles this method, if any is integrated.
    pub fn provider(self) -> Option<GatewayProvider> {
        match self {
            Self::Paystack => Some(GatewayProvider::Paystack),
            Self::Flutterwave => Some(GatewayProvider::Flutterwave),
            Self::Stripe => Some(GatewayProvider::Stripe),
            Self::Card | Self::BankTransfer | Self::Paypal => None,
        }
    }

    pub fn require_provider(self) -> Result<GatewayProvider, PaymentError> {
        self.provider()
            .ok_or_else(|| PaymentError::UnsupportedGateway(self.as_str().to_string()))
    }
}

/// Input for a new payment; the ledger assigns reference, status and times.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: u64,
    pub payer_id: u64,
    pub amount: Amount,
    pub currency: Currency,
    pub method: PaymentMethod,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub reference: String,
    pub order_id: u64,
    pub payer_id: u64,
    pub amount: Amount,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub gateway_transaction_id: Option<String>,
    pub gateway_reference: Option<String>,
    pub gateway_response: Option<serde_json::Value>,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(reference: String, input: NewPayment, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            reference,
            order_id: input.order_id,
            payer_id: input.payer_id,
            amount: input.amount,
            currency: input.currency,
            status: PaymentStatus::Pending,
            method: input.method,
            gateway_transaction_id: None,
            gateway_reference: None,
            gateway_response: None,
            description: input.description,
            metadata: input.metadata,
            expires_at: now + ttl,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies `event`, leaving the payment untouched if it is illegal.
    pub fn apply(&mut self, event: PaymentEvent, now: DateTime<Utc>) -> Result<PaymentStatus, PaymentError> {
        let next = self.status.transition(event)?;
        self.status = next;
        self.updated_at = now;
        if next == PaymentStatus::Completed && self.paid_at.is_none() {
            self.paid_at = Some(now);
        }
        Ok(next)
    }
}
