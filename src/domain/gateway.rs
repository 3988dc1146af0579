use super::money::{Amount, Currency};
use crate::error::PaymentError;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every third-party processor this service can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayProvider {
    Paystack,
    Flutterwave,
    Stripe,
}

/// How a provider expects amounts on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountEncoding {
    /// Integer count of the smallest currency unit (kobo, cents).
    MinorUnits,
    /// Decimal amount in the main currency unit.
    MajorUnits,
}

impl GatewayProvider {
    pub const ALL: [GatewayProvider; 3] = [Self::Paystack, Self::Flutterwave, Self::Stripe];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Paystack => "paystack",
            Self::Flutterwave => "flutterwave",
            Self::Stripe => "stripe",
        }
    }

    pub fn amount_encoding(&self) -> AmountEncoding {
        match self {
            Self::Paystack | Self::Stripe => AmountEncoding::MinorUnits,
            Self::Flutterwave => AmountEncoding::MajorUnits,
        }
    }

    /// Encodes `amount` the way this provider's API expects it.
    pub fn encode_amount(&self, amount: Amount) -> Result<serde_json::Value, PaymentError> {
        match self.amount_encoding() {
            AmountEncoding::MinorUnits => Ok(serde_json::Value::from(amount.to_minor_units()?)),
            AmountEncoding::MajorUnits => amount
                .value()
                .to_f64()
                .map(serde_json::Value::from)
                .ok_or_else(|| PaymentError::ValidationError(format!("Amount {amount} is out of range"))),
        }
    }
}

impl FromStr for GatewayProvider {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paystack" => Ok(Self::Paystack),
            "flutterwave" => Ok(Self::Flutterwave),
            "stripe" => Ok(Self::Stripe),
            other => Err(PaymentError::UnsupportedGateway(other.to_string())),
        }
    }
}

impl fmt::Display for GatewayProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitializeRequest {
    pub payer_email: String,
    pub amount: Amount,
    pub currency: Currency,
    pub reference: String,
    pub callback_url: String,
    pub metadata: Option<serde_json::Value>,
}

/// Where to send the payer to complete the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub authorization_url: String,
    pub access_code: String,
}

/// Outcome of asking the provider about a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub succeeded: bool,
    pub gateway_transaction_id: Option<String>,
    pub raw_response: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_provider_names_round_trip() {
        for provider in GatewayProvider::ALL {
            assert_eq!(provider.name().parse::<GatewayProvider>().unwrap(), provider);
        }
        assert_eq!("PayStack".parse::<GatewayProvider>().unwrap(), GatewayProvider::Paystack);
    }

    #[test]
    fn test_unknown_provider_is_unsupported() {
        assert!(matches!(
            "paypal".parse::<GatewayProvider>(),
            Err(PaymentError::UnsupportedGateway(name)) if name == "paypal"
        ));
    }

    #[test]
    fn test_amount_encoding_per_provider() {
        let amount = Amount::new(dec!(5000.00)).unwrap();
        assert_eq!(GatewayProvider::Paystack.encode_amount(amount).unwrap(), serde_json::json!(500000));
        assert_eq!(GatewayProvider::Stripe.encode_amount(amount).unwrap(), serde_json::json!(500000));
        assert_eq!(
            GatewayProvider::Flutterwave.encode_amount(amount).unwrap(),
            serde_json::json!(5000.0)
        );
    }

    #[test]
    fn test_largest_amount_encodes_without_overflow() {
        let largest = Amount::new(crate::domain::money::MAX_AMOUNT).unwrap();
        for provider in GatewayProvider::ALL {
            assert!(provider.encode_amount(largest).is_ok(), "{provider}");
        }
        assert_eq!(
            GatewayProvider::Paystack.encode_amount(largest).unwrap(),
            serde_json::json!(99_999_999_999_999_i64)
        );
    }
}
