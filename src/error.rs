use crate::domain::payment::{PaymentEvent, PaymentStatus};
use crate::domain::refund::RefundStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Missing or malformed caller identity")]
    Unauthorized,
    #[error("Invalid state transition: {event:?} is not allowed from {from:?}")]
    InvalidStateTransition {
        from: PaymentStatus,
        event: PaymentEvent,
    },
    #[error("Invalid refund transition: {from:?} -> {to:?}")]
    InvalidRefundTransition { from: RefundStatus, to: RefundStatus },
    #[error("Unsupported payment gateway: {0}")]
    UnsupportedGateway(String),
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Payment gateway rejected the request: {0}")]
    GatewayRejected(String),
    #[error("Payment initialization failed: {0}")]
    PaymentInitiationFailed(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

impl PaymentError {
    /// Stable machine-readable code, independent of the message text.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Unauthorized => "unauthorized",
            Self::InvalidStateTransition { .. } | Self::InvalidRefundTransition { .. } => {
                "invalid_state_transition"
            }
            Self::UnsupportedGateway(_) => "unsupported_gateway",
            Self::GatewayUnavailable(_) => "gateway_unavailable",
            Self::GatewayRejected(_) => "gateway_rejected",
            Self::PaymentInitiationFailed(_) => "payment_initiation_failed",
            Self::ValidationError(_) => "validation_error",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) | Self::Config(_) | Self::CsvError(_) | Self::IoError(_) => {
                "internal_error"
            }
            #[cfg(feature = "storage-rocksdb")]
            Self::RocksDb(_) => "internal_error",
        }
    }

    /// Only a gateway outage is worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::GatewayUnavailable(_))
    }

    pub fn payment_not_found(reference: &str) -> Self {
        Self::NotFound(format!("Payment {reference}"))
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(format!("Serialization error: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_for_client_facing_variants() {
        let errors = [
            PaymentError::NotFound("x".into()),
            PaymentError::Forbidden("x".into()),
            PaymentError::Unauthorized,
            PaymentError::InvalidStateTransition {
                from: PaymentStatus::Completed,
                event: PaymentEvent::VerificationStarted,
            },
            PaymentError::UnsupportedGateway("x".into()),
            PaymentError::GatewayUnavailable("x".into()),
            PaymentError::GatewayRejected("x".into()),
            PaymentError::PaymentInitiationFailed("x".into()),
            PaymentError::ValidationError("x".into()),
            PaymentError::Conflict("x".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(PaymentError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_only_gateway_unavailable_is_retryable() {
        assert!(PaymentError::GatewayUnavailable("timeout".into()).is_retryable());
        assert!(!PaymentError::PaymentInitiationFailed("declined".into()).is_retryable());
        assert!(!PaymentError::ValidationError("bad".into()).is_retryable());
    }
}
