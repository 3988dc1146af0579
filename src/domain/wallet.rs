use super::money::{Amount, Balance, Currency};
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Credit,
    Debit,
}

/// Immutable record of one balance change.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WalletTransaction {
    pub payer_id: u64,
    pub kind: EntryKind,
    pub amount: Amount,
    pub balance_before: Balance,
    pub balance_after: Balance,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A payer's stored-value balance.
///
/// `version` increases with every applied entry so stores can reject a
/// write computed from a stale read.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Wallet {
    pub payer_id: u64,
    pub balance: Balance,
    pub currency: Currency,
    pub is_active: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters of a credit or debit.
#[derive(Debug, Clone)]
pub struct WalletEntryRequest {
    pub kind: EntryKind,
    pub amount: Amount,
    pub description: Option<String>,
    pub reference: Option<String>,
}

impl Wallet {
    pub fn new(payer_id: u64, currency: Currency, now: DateTime<Utc>) -> Self {
        Self {
            payer_id,
            balance: Balance::ZERO,
            currency,
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a credit or debit and returns the ledger entry describing it.
    /// Debits never take the balance below zero.
    pub fn apply(&mut self, request: WalletEntryRequest, now: DateTime<Utc>) -> Result<WalletTransaction, PaymentError> {
        if !self.is_active {
            return Err(PaymentError::ValidationError(
                "Wallet is inactive".to_string(),
            ));
        }

        let before = self.balance;
        let delta: Balance = request.amount.into();
        match request.kind {
            EntryKind::Credit => self.balance = self.balance.checked_add(delta)?,
            EntryKind::Debit => {
                if self.balance < delta {
                    return Err(PaymentError::ValidationError(
                        "Insufficient funds".to_string(),
                    ));
                }
                self.balance = self.balance.checked_sub(delta)?;
            }
        }
        self.version += 1;
        self.updated_at = now;

        Ok(WalletTransaction {
            payer_id: self.payer_id,
            kind: request.kind,
            amount: request.amount,
            balance_before: before,
            balance_after: self.balance,
            description: request.description,
            reference: request.reference,
            created_at: now,
        })
    }
}
