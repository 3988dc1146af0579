use crate::error::PaymentError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimal places every supported currency settles in.
pub const MINOR_UNIT_EXPONENT: u32 = 2;

/// Largest amount accepted for a single payment, refund or wallet entry.
/// Its minor units fit an `i64` with room for sums.
pub const MAX_AMOUNT: Decimal = dec!(999_999_999_999.99);

/// A strictly positive monetary amount with at most two decimal places.
///
/// The two-decimal limit keeps the conversion to minor units (kobo, cents)
/// exact, which the gateways rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value <= Decimal::ZERO {
            return Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }
        if value > MAX_AMOUNT {
            return Err(PaymentError::ValidationError(format!(
                "Amount {value} exceeds the maximum of {MAX_AMOUNT}"
            )));
        }
        let normalized = value.normalize();
        if normalized.scale() > MINOR_UNIT_EXPONENT {
            return Err(PaymentError::ValidationError(format!(
                "Amount {value} has more than {MINOR_UNIT_EXPONENT} decimal places"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Amount in the currency's smallest unit (e.g. 5000.00 NGN -> 500000 kobo).
    pub fn to_minor_units(&self) -> Result<i64, PaymentError> {
        self.0
            .checked_mul(Decimal::from(10_i64.pow(MINOR_UNIT_EXPONENT)))
            .and_then(|scaled| scaled.trunc().to_i64())
            .ok_or_else(|| PaymentError::ValidationError(format!("Amount {} is out of range", self.0)))
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A running monetary value that may be zero, used for wallet balances and
/// cumulative sums.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, PaymentError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| PaymentError::ValidationError(format!("{self} + {rhs} overflows")))
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, PaymentError> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or_else(|| PaymentError::ValidationError(format!("{self} - {rhs} overflows")))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// ISO-4217 style currency code, three uppercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, PaymentError> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(PaymentError::ValidationError(format!(
                "Invalid currency code: {code}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self("NGN".to_string())
    }
}

impl TryFrom<String> for Currency {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_arithmetic() {
        let b1 = Balance::new(dec!(10.0));
        let b2 = Balance::new(dec!(5.0));
        assert_eq!(b1.checked_add(b2).unwrap(), Balance::new(dec!(15.0)));
        assert_eq!(b1.checked_sub(b2).unwrap(), Balance::new(dec!(5.0)));
        assert!(matches!(
            Balance::new(Decimal::MAX).checked_add(b2),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_huge_amounts_are_rejected_not_panicking() {
        assert!(matches!(
            Amount::new(Decimal::MAX),
            Err(PaymentError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(1_000_000_000_000)),
            Err(PaymentError::ValidationError(_))
        ));
        let largest = Amount::new(MAX_AMOUNT).unwrap();
        assert_eq!(largest.to_minor_units().unwrap(), 99_999_999_999_999);
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(Amount::new(dec!(19.990)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(PaymentError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(PaymentError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(1.005)),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_minor_units_are_exact() {
        assert_eq!(Amount::new(dec!(5000.00)).unwrap().to_minor_units().unwrap(), 500000);
        assert_eq!(Amount::new(dec!(0.01)).unwrap().to_minor_units().unwrap(), 1);
        assert_eq!(Amount::new(dec!(19.99)).unwrap().to_minor_units().unwrap(), 1999);
    }

    #[test]
    fn test_amount_deserialization_validates() {
        let ok: Amount = serde_json::from_str("\"3000.50\"").unwrap();
        assert_eq!(ok.value(), dec!(3000.50));
        assert!(serde_json::from_str::<Amount>("\"-3\"").is_err());
    }

    #[test]
    fn test_currency_normalizes_case() {
        assert_eq!(Currency::new("usd").unwrap().as_str(), "USD");
        assert!(Currency::new("NAIRA").is_err());
        assert_eq!(Currency::default().as_str(), "NGN");
    }
}
