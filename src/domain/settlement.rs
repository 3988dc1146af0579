use serde::{Deserialize, Serialize};

/// What the order subsystem is told about a settled payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementOutcome {
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementNotice {
    pub order_id: u64,
    pub payment_reference: String,
    pub outcome: SettlementOutcome,
}
