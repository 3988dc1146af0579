//! Process-wide configuration, loaded once at startup and passed down by
//! reference.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. environment variables for secrets and deployment addresses

use crate::domain::gateway::GatewayProvider;
use crate::domain::money::Currency;
use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub gateways: GatewaysConfig,
    pub order_service: OrderServiceConfig,
    pub payments: PaymentsConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8004".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaysConfig {
    /// Provider names to build clients for, e.g. `["paystack", "stripe"]`.
    pub enabled: Vec<String>,
    pub timeout_secs: u64,
    pub paystack: ProviderConfig,
    pub flutterwave: ProviderConfig,
    pub stripe: ProviderConfig,
}

impl Default for GatewaysConfig {
    fn default() -> Self {
        Self {
            enabled: vec!["paystack".to_string()],
            timeout_secs: 20,
            paystack: ProviderConfig::default(),
            flutterwave: ProviderConfig::default(),
            stripe: ProviderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub secret_key: String,
    pub public_key: Option<String>,
    /// Overrides the provider's production API root.
    pub base_url: Option<String>,
}

impl GatewaysConfig {
    pub fn provider(&self, provider: GatewayProvider) -> &ProviderConfig {
        match provider {
            GatewayProvider::Paystack => &self.paystack,
            GatewayProvider::Flutterwave => &self.flutterwave,
            GatewayProvider::Stripe => &self.stripe,
        }
    }

    pub fn base_url(&self, provider: GatewayProvider) -> String {
        self.provider(provider).base_url.clone().unwrap_or_else(|| {
            match provider {
                GatewayProvider::Paystack => "https://api.paystack.co",
                GatewayProvider::Flutterwave => "https://api.flutterwave.com/v3",
                GatewayProvider::Stripe => "https://api.stripe.com",
            }
            .to_string()
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parses the enabled names, rejecting unknown providers.
    pub fn enabled_providers(&self) -> Result<Vec<GatewayProvider>> {
        self.enabled.iter().map(|name| name.parse()).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrderServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://order-service:8003".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    pub currency: String,
    pub expiry_minutes: i64,
    /// Used to build a contact address when the caller has no email on file.
    pub payer_email_domain: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            currency: "NGN".to_string(),
            expiry_minutes: 60,
            payer_email_domain: "executetechacademy.com".to_string(),
        }
    }
}

impl PaymentsConfig {
    pub fn currency(&self) -> Result<Currency> {
        Currency::new(&self.currency)
    }

    pub fn expiry(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.expiry_minutes)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: Option<PathBuf>,
}

impl Config {
    /// Loads defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PaymentError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PaymentError::Config(format!("parse error: {e}")))
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(v) = lookup("ORDER_SERVICE_URL") {
            self.order_service.base_url = v;
        }
        if let Some(v) = lookup("PAYSTACK_SECRET_KEY") {
            self.gateways.paystack.secret_key = v;
        }
        if let Some(v) = lookup("PAYSTACK_PUBLIC_KEY") {
            self.gateways.paystack.public_key = Some(v);
        }
        if let Some(v) = lookup("FLUTTERWAVE_SECRET_KEY") {
            self.gateways.flutterwave.secret_key = v;
        }
        if let Some(v) = lookup("FLUTTERWAVE_PUBLIC_KEY") {
            self.gateways.flutterwave.public_key = Some(v);
        }
        if let Some(v) = lookup("STRIPE_SECRET_KEY") {
            self.gateways.stripe.secret_key = v;
        }
        if let Some(v) = lookup("STRIPE_PUBLISHABLE_KEY") {
            self.gateways.stripe.public_key = Some(v);
        }
        if let Some(v) = lookup("PAYMENT_DB_PATH") {
            self.storage.db_path = Some(PathBuf::from(v));
        }
    }

    pub fn validate(&self) -> Result<()> {
        for provider in self.gateways.enabled_providers()? {
            if self.gateways.provider(provider).secret_key.is_empty() {
                tracing::warn!(%provider, "gateway enabled without a secret key");
            }
        }
        if !(1..=120).contains(&self.gateways.timeout_secs) {
            return Err(PaymentError::Config(
                "gateways.timeout_secs must be between 1 and 120".to_string(),
            ));
        }
        if !(1..=120).contains(&self.order_service.timeout_secs) {
            return Err(PaymentError::Config(
                "order_service.timeout_secs must be between 1 and 120".to_string(),
            ));
        }
        if self.payments.expiry_minutes <= 0 {
            return Err(PaymentError::Config(
                "payments.expiry_minutes must be positive".to_string(),
            ));
        }
        self.payments
            .currency()
            .map_err(|e| PaymentError::Config(e.to_string()))?;
        Ok(())
    }
}
