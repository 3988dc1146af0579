//! Externally visible references for payments, refunds and invoices.
//!
//! Format: `{PREFIX}-{N uppercase hex chars}` taken from a random v4 UUID.
//! Uniqueness is still enforced by the stores; a collision surfaces as
//! `PaymentError::Conflict` and the caller generates a new reference.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Payment,
    Refund,
    Invoice,
}

impl ReferenceKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Payment => "PAY-",
            Self::Refund => "REF-",
            Self::Invoice => "INV-",
        }
    }

    /// Number of hex characters after the prefix.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Payment | Self::Refund => 12,
            Self::Invoice => 10,
        }
    }

    pub fn generate(&self) -> String {
        let hex = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        format!("{}{}", self.prefix(), &hex[..self.hex_len()])
    }

    pub fn matches(&self, s: &str) -> bool {
        let Some(hex) = s.strip_prefix(self.prefix()) else {
            return false;
        };
        hex.len() == self.hex_len()
            && hex
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
    }
}
