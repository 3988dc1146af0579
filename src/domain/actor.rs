use crate::error::PaymentError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

/// The authenticated caller, as forwarded by the API gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: u64,
    pub role: Role,
    pub email: Option<String>,
}

impl Actor {
    pub fn new(user_id: u64, role: Role) -> Self {
        Self {
            user_id,
            role,
            email: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), PaymentError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(PaymentError::Forbidden("Admin role required".to_string()))
        }
    }

    /// Admins may act on anything; everyone else only on what they own.
    pub fn require_owner_or_admin(&self, owner_id: u64) -> Result<(), PaymentError> {
        if self.is_admin() || self.user_id == owner_id {
            Ok(())
        } else {
            Err(PaymentError::Forbidden("Not enough permissions".to_string()))
        }
    }
}
